//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds one section router per content domain under `/api/sections` plus
//! a health probe. The public site and admin editor both talk to these
//! endpoints; neither is served from here.

pub mod sections;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/sections/solutions", sections::section_routes(state.solutions))
        .nest("/api/sections/markets", sections::section_routes(state.markets))
        .nest("/api/sections/visual-solutions", sections::section_routes(state.visual_solutions))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
