use sitecards::{config, routes, state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let state = state::AppState::from_config(&config)
        .await
        .expect("startup failed");

    let _event_loggers = state.spawn_event_loggers();

    // Remote is authoritative; refresh local copies before serving.
    let pulled = state.pull_all().await;
    tracing::info!(pulled, remote = config.remote_kind(), "section configs synced");

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "sitecards listening");
    axum::serve(listener, app).await.expect("server failed");
}
