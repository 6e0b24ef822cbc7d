//! Remote sync: adapters for the shared `site_configs` table.
//!
//! DESIGN
//! ======
//! The hosted table is the authoritative copy of every section config. It
//! has one row per logical name (`key`), a JSON `content` column, and an
//! `updated_at` timestamp. Stores only need two operations: fetch the row
//! for a key if it exists, and upsert a row with `key` as the conflict
//! target so repeated saves overwrite instead of duplicating.
//!
//! `RemoteTable` is the seam. Backends:
//! - `SupabaseRest`: PostgREST over HTTP (`reqwest`).
//! - `PgSiteConfigs`: direct Postgres (`sqlx`).
//! - `MemoryTable`: in-process table for local development and tests.
//!
//! ERROR HANDLING
//! ==============
//! A missing row is `Ok(None)`, never an error. Transport, auth and
//! constraint failures surface as `RemoteError`; the store logs them and
//! degrades to `None` / `false`.

pub mod memory;
pub mod postgres;
pub mod rest;

use serde::{Deserialize, Serialize};

pub use memory::MemoryTable;
pub use postgres::PgSiteConfigs;
pub use rest::SupabaseRest;

pub const SITE_CONFIGS_TABLE: &str = "site_configs";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("remote request failed: {0}")]
    Request(String),

    #[error("remote response error: status {status}")]
    Response { status: u16, body: String },

    #[error("remote response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// One row of `site_configs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub key: String,
    pub content: serde_json::Value,
    pub updated_at: String,
}

#[async_trait::async_trait]
pub trait RemoteTable: Send + Sync {
    /// Fetch the row stored under `key`, if any.
    async fn fetch(&self, key: &str) -> Result<Option<RemoteRow>, RemoteError>;

    /// Insert `row`, or overwrite the existing row with the same key.
    async fn upsert(&self, row: &RemoteRow) -> Result<(), RemoteError>;
}
