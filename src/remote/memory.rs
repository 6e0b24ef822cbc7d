//! In-process `site_configs` table. Selected with `REMOTE_BACKEND=memory`
//! for offline development; also the remote used throughout the tests.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{RemoteError, RemoteRow, RemoteTable};

#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: RwLock<HashMap<String, RemoteRow>>,
}

impl MemoryTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RemoteTable for MemoryTable {
    async fn fetch(&self, key: &str) -> Result<Option<RemoteRow>, RemoteError> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn upsert(&self, row: &RemoteRow) -> Result<(), RemoteError> {
        self.rows.write().await.insert(row.key.clone(), row.clone());
        Ok(())
    }
}
