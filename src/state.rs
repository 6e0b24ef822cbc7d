//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is the composition root: it owns one `ConfigStore` per site
//! section, all sharing the same local cache backend and remote table. It
//! is injected into Axum handlers and cloned freely; every field is an
//! `Arc`.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cards::{Card, MarketTag, SolutionCard, VisualSolutionCard, markets, solutions, visual};
use crate::config::{AppConfig, RemoteBackend};
use crate::remote::{MemoryTable, PgSiteConfigs, RemoteError, RemoteTable, SupabaseRest};
use crate::store::cache::{FileStore, LocalCache};
use crate::store::{ConfigStore, StoreEvent};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("remote client init failed: {0}")]
    Remote(#[from] RemoteError),
}

#[derive(Clone)]
pub struct AppState {
    pub solutions: Arc<ConfigStore<SolutionCard>>,
    pub markets: Arc<ConfigStore<MarketTag>>,
    pub visual_solutions: Arc<ConfigStore<VisualSolutionCard>>,
}

impl AppState {
    #[must_use]
    pub fn new(cache: LocalCache, remote: Option<Arc<dyn RemoteTable>>) -> Self {
        Self {
            solutions: Arc::new(ConfigStore::new(solutions::store_spec(), cache.clone(), remote.clone())),
            markets: Arc::new(ConfigStore::new(markets::store_spec(), cache.clone(), remote.clone())),
            visual_solutions: Arc::new(ConfigStore::new(visual::store_spec(), cache, remote)),
        }
    }

    /// Build the file-backed cache and the configured remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the database pool or HTTP client cannot be built.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let cache = LocalCache::new(Arc::new(FileStore::new(&config.cache_dir)), config.cache_max_bytes);

        let remote: Option<Arc<dyn RemoteTable>> = match &config.remote {
            RemoteBackend::None => None,
            RemoteBackend::Memory => Some(Arc::new(MemoryTable::new())),
            RemoteBackend::Rest { url, anon_key, timeouts } => {
                Some(Arc::new(SupabaseRest::new(url, anon_key.clone(), *timeouts)?))
            }
            RemoteBackend::Postgres { database_url, max_connections } => {
                let pool = crate::db::init_pool(database_url, *max_connections).await?;
                Some(Arc::new(PgSiteConfigs::new(pool)))
            }
        };

        Ok(Self::new(cache, remote))
    }

    /// Pull every section from the remote table into the local cache.
    /// Returns how many sections were refreshed.
    pub async fn pull_all(&self) -> usize {
        let (a, b, c) = tokio::join!(
            self.solutions.fetch_from_supabase(),
            self.markets.fetch_from_supabase(),
            self.visual_solutions.fetch_from_supabase(),
        );
        [a.is_some(), b.is_some(), c.is_some()]
            .into_iter()
            .filter(|pulled| *pulled)
            .count()
    }

    /// Log every store event. Handles end when the stores are dropped.
    #[must_use]
    pub fn spawn_event_loggers(&self) -> Vec<JoinHandle<()>> {
        vec![
            spawn_event_logger(&self.solutions),
            spawn_event_logger(&self.markets),
            spawn_event_logger(&self.visual_solutions),
        ]
    }
}

fn spawn_event_logger<C: Card>(store: &Arc<ConfigStore<C>>) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    let prefix = store.spec().event_prefix.clone();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StoreEvent::Updated) => info!(event = %format!("{prefix}:updated"), "section config changed"),
                Ok(StoreEvent::SaveFailed) => warn!(event = %format!("{prefix}:save_failed"), "section save failed"),
                Err(RecvError::Lagged(skipped)) => warn!(%prefix, skipped, "event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

// =============================================================================
// TEST HELPERS
// =============================================================================
