//! Service configuration parsed from environment variables.
//!
//! Parsing goes through a lookup closure so tests can feed a fixed map
//! instead of mutating the process environment.

use std::path::PathBuf;

use crate::store::cache::DEFAULT_CACHE_MAX_BYTES;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CACHE_DIR: &str = "./data/cache";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_REMOTE_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_REMOTE_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown REMOTE_BACKEND: {0}")]
    UnknownBackend(String),
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBackend {
    /// Local cache only; remote pulls and publishes report failure.
    None,
    Memory,
    Rest { url: String, anon_key: String, timeouts: RemoteTimeouts },
    Postgres { database_url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub cache_dir: PathBuf,
    pub cache_max_bytes: usize,
    pub remote: RemoteBackend,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `CACHE_DIR`: default `./data/cache`
    /// - `CACHE_MAX_BYTES`: default 4718592
    /// - `REMOTE_BACKEND`: `none`, `memory`, `rest` or `postgres`. When
    ///   absent: `postgres` if `DATABASE_URL` is set, else `rest` if
    ///   `SUPABASE_URL` is set, else `none`.
    /// - `DATABASE_URL`, `DB_MAX_CONNECTIONS` (default 5)
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`
    /// - `REMOTE_REQUEST_TIMEOUT_SECS` (15), `REMOTE_CONNECT_TIMEOUT_SECS` (5)
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown backend or a backend missing its
    /// connection settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);
        let cache_dir = lookup("CACHE_DIR").map_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from);
        let cache_max_bytes = parse_or(&lookup, "CACHE_MAX_BYTES", DEFAULT_CACHE_MAX_BYTES);
        let remote = parse_remote(&lookup)?;
        Ok(Self { port, cache_dir, cache_max_bytes, remote })
    }

    /// Backend name for logs. Never includes URLs or keys.
    #[must_use]
    pub fn remote_kind(&self) -> &'static str {
        match self.remote {
            RemoteBackend::None => "none",
            RemoteBackend::Memory => "memory",
            RemoteBackend::Rest { .. } => "rest",
            RemoteBackend::Postgres { .. } => "postgres",
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn parse_remote(lookup: &impl Fn(&str) -> Option<String>) -> Result<RemoteBackend, ConfigError> {
    let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
    let supabase_url = lookup("SUPABASE_URL").filter(|v| !v.is_empty());

    let kind = match lookup("REMOTE_BACKEND") {
        Some(kind) => kind.trim().to_ascii_lowercase(),
        None if database_url.is_some() => "postgres".to_owned(),
        None if supabase_url.is_some() => "rest".to_owned(),
        None => "none".to_owned(),
    };

    match kind.as_str() {
        "none" => Ok(RemoteBackend::None),
        "memory" => Ok(RemoteBackend::Memory),
        "rest" => {
            let url = supabase_url.ok_or(ConfigError::Missing { var: "SUPABASE_URL" })?;
            let anon_key = lookup("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing { var: "SUPABASE_ANON_KEY" })?;
            let timeouts = RemoteTimeouts {
                request_secs: parse_or(lookup, "REMOTE_REQUEST_TIMEOUT_SECS", DEFAULT_REMOTE_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(lookup, "REMOTE_CONNECT_TIMEOUT_SECS", DEFAULT_REMOTE_CONNECT_TIMEOUT_SECS),
            };
            Ok(RemoteBackend::Rest { url, anon_key, timeouts })
        }
        "postgres" => {
            let database_url = database_url.ok_or(ConfigError::Missing { var: "DATABASE_URL" })?;
            let max_connections = parse_or(lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
            Ok(RemoteBackend::Postgres { database_url, max_connections })
        }
        other => Err(ConfigError::UnknownBackend(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
