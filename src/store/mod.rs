//! Config store: cached, validated, normalized section configs.
//!
//! DESIGN
//! ======
//! One `ConfigStore<C>` per section. Reads go local cache → JSON parse →
//! validator → normalizer, falling back to the compiled-in default, so a
//! usable config is always available without waiting on the network.
//! Writes normalize first, stamp `updatedAt`, then hit the cache with its
//! size guard. The remote table is the shared authoritative copy: a
//! successful pull supersedes the local copy and is written back to the
//! cache opportunistically.
//!
//! Change notifications are payload-free `StoreEvent`s on a broadcast
//! channel. Subscribers re-query the store; they never read state off the
//! event.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here returns an error to the caller. Malformed input becomes
//! `None` or a failed `ImportOutcome`, a refused write becomes `false` plus
//! `SaveFailed`, and remote failures are logged and become `None`/`false`.
//!
//! A pull that completes after a newer local save or reset does not
//! overwrite the cache. The generation counter detects that case; local
//! writes and the pull's compare-and-write share one lock so nothing lands
//! between the check and the write.

pub mod cache;
pub mod normalize;
pub mod slug;
pub mod validate;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::cards::{Card, SectionConfig};
use crate::remote::{RemoteRow, RemoteTable};
use cache::LocalCache;
use normalize::with_free_suffix;

pub const EXPORT_MIME: &str = "application/json";
const EVENT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// TYPES
// =============================================================================

/// Constructor parameters that distinguish one section's store from another.
#[derive(Debug, Clone)]
pub struct StoreSpec<C> {
    /// Local cache key, e.g. `aiMaster:solutions`.
    pub storage_key: String,
    /// Row key in the remote `site_configs` table.
    pub logical_name: String,
    /// Event name prefix, e.g. `solutions` for `solutions:updated`.
    pub event_prefix: String,
    pub defaults: SectionConfig<C>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Updated,
    SaveFailed,
}

impl StoreEvent {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::SaveFailed => "save_failed",
        }
    }
}

/// Downloadable export of the current config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub mime: &'static str,
    pub file_name: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    fn ok() -> Self {
        Self { success: true, error: None }
    }

    fn failed(reason: &str) -> Self {
        Self { success: false, error: Some(reason.to_owned()) }
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct ConfigStore<C: Card> {
    spec: StoreSpec<C>,
    cache: LocalCache,
    remote: Option<Arc<dyn RemoteTable>>,
    events: broadcast::Sender<StoreEvent>,
    /// Bumped by every local save and reset. Held across each cache write.
    generation: Mutex<u64>,
}

impl<C: Card> ConfigStore<C> {
    #[must_use]
    pub fn new(spec: StoreSpec<C>, cache: LocalCache, remote: Option<Arc<dyn RemoteTable>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { spec, cache, remote, events, generation: Mutex::new(0) }
    }

    #[must_use]
    pub fn spec(&self) -> &StoreSpec<C> {
        &self.spec
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Full event name, e.g. `solutions:updated`.
    #[must_use]
    pub fn event_name(&self, event: StoreEvent) -> String {
        format!("{}:{}", self.spec.event_prefix, event.suffix())
    }

    // -------------------------------------------------------------------------
    // LOCAL
    // -------------------------------------------------------------------------

    /// Cached config, or `None` when missing, unparseable or invalid.
    #[must_use]
    pub fn get_config(&self) -> Option<SectionConfig<C>> {
        let text = self.cache.read(&self.spec.storage_key)?;

        let raw: serde_json::Value = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.spec.storage_key, error = %e, "cached config is not valid JSON");
                return None;
            }
        };

        match validate::decode::<C>(&raw) {
            Ok(config) => Some(config.normalized()),
            Err(e) => {
                warn!(key = %self.spec.storage_key, error = %e, "cached config failed validation");
                None
            }
        }
    }

    /// Cached config or the compiled-in default. Never fails.
    #[must_use]
    pub fn safe_get_config_or_defaults(&self) -> SectionConfig<C> {
        self.get_config().unwrap_or_else(|| self.spec.defaults.clone())
    }

    /// Normalize, stamp and cache `config`. Returns whether it was stored.
    pub fn save_config(&self, config: &SectionConfig<C>) -> bool {
        if !self.cache.is_available() {
            debug!(key = %self.spec.storage_key, "no local storage; save skipped");
            return false;
        }

        let prepared = self.prepare(config);
        let text = match serde_json::to_string(&prepared) {
            Ok(text) => text,
            Err(e) => {
                error!(key = %self.spec.storage_key, error = %e, "config serialization failed");
                self.emit(StoreEvent::SaveFailed);
                return false;
            }
        };

        let written = {
            let mut generation = self.lock_generation();
            let written = self.cache.write(&self.spec.storage_key, &text);
            if written.is_ok() {
                *generation += 1;
            }
            written
        };

        match written {
            Ok(()) => {
                info!(key = %self.spec.storage_key, items = prepared.items.len(), "config saved");
                self.emit(StoreEvent::Updated);
                true
            }
            Err(e) => {
                warn!(key = %self.spec.storage_key, error = %e, "config save failed");
                self.emit(StoreEvent::SaveFailed);
                false
            }
        }
    }

    /// Drop the cached config. Remote state is untouched.
    pub fn reset_to_defaults(&self) {
        {
            let mut generation = self.lock_generation();
            self.cache.remove(&self.spec.storage_key);
            *generation += 1;
        }
        info!(key = %self.spec.storage_key, "config reset to defaults");
    }

    /// Pretty-printed JSON of the current config (or defaults).
    #[must_use]
    pub fn export_config(&self) -> ExportPayload {
        let config = self.safe_get_config_or_defaults();
        let body = serde_json::to_string_pretty(&config).unwrap_or_else(|e| {
            error!(key = %self.spec.storage_key, error = %e, "config export serialization failed");
            String::from("{}")
        });
        ExportPayload { mime: EXPORT_MIME, file_name: format!("{}-config.json", self.spec.logical_name), body }
    }

    /// Parse, validate and save an exported config.
    pub fn import_config(&self, json_text: &str) -> ImportOutcome {
        let raw: serde_json::Value = match serde_json::from_str(json_text) {
            Ok(raw) => raw,
            Err(_) => return ImportOutcome::failed("Invalid JSON format"),
        };

        let config = match validate::decode::<C>(&raw) {
            Ok(config) => config,
            Err(e) => {
                debug!(key = %self.spec.storage_key, error = %e, "rejected import");
                return ImportOutcome::failed("Invalid configuration format");
            }
        };

        if self.save_config(&config) {
            ImportOutcome::ok()
        } else {
            ImportOutcome::failed("Failed to save configuration")
        }
    }

    /// Slug for `label` that no card in the current config uses yet.
    #[must_use]
    pub fn generate_id(&self, label: &str) -> String {
        let current = self.safe_get_config_or_defaults();
        with_free_suffix(&slug::slugify(label), |candidate| current.contains_id(candidate))
    }

    // -------------------------------------------------------------------------
    // REMOTE
    // -------------------------------------------------------------------------

    /// Pull the authoritative config from the remote table.
    ///
    /// On success the normalized config is also written to the local cache,
    /// unless a local save or reset happened while the pull was in flight.
    pub async fn fetch_from_supabase(&self) -> Option<SectionConfig<C>> {
        let Some(remote) = &self.remote else {
            debug!(name = %self.spec.logical_name, "no remote configured; fetch skipped");
            return None;
        };
        let generation = *self.lock_generation();

        let row = match remote.fetch(&self.spec.logical_name).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!(name = %self.spec.logical_name, "no remote config row");
                return None;
            }
            Err(e) => {
                error!(name = %self.spec.logical_name, error = %e, "remote config fetch failed");
                return None;
            }
        };

        let mut config = match validate::decode::<C>(&row.content) {
            Ok(config) => config.normalized(),
            Err(e) => {
                warn!(name = %self.spec.logical_name, error = %e, "remote config failed validation");
                return None;
            }
        };
        if config.updated_at.is_empty() {
            config.updated_at = row.updated_at;
        }

        if !self.cache_if_unchanged(generation, &config) {
            debug!(name = %self.spec.logical_name, "local config changed during fetch; cache left as is");
        }

        Some(config)
    }

    /// Normalize, stamp and upsert `config` into the remote table.
    pub async fn save_to_supabase(&self, config: &SectionConfig<C>) -> bool {
        let Some(remote) = &self.remote else {
            warn!(name = %self.spec.logical_name, "no remote configured; publish skipped");
            return false;
        };

        let prepared = self.prepare(config);
        let content = match serde_json::to_value(&prepared) {
            Ok(content) => content,
            Err(e) => {
                error!(name = %self.spec.logical_name, error = %e, "config serialization failed");
                return false;
            }
        };
        let row = RemoteRow { key: self.spec.logical_name.clone(), content, updated_at: prepared.updated_at };

        match remote.upsert(&row).await {
            Ok(()) => {
                info!(name = %self.spec.logical_name, "config published to remote");
                self.emit(StoreEvent::Updated);
                true
            }
            Err(e) => {
                error!(name = %self.spec.logical_name, error = %e, "remote config upsert failed");
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // HELPERS
    // -------------------------------------------------------------------------

    fn prepare(&self, config: &SectionConfig<C>) -> SectionConfig<C> {
        let mut prepared = config.normalized();
        prepared.updated_at = now_rfc3339();
        prepared
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        // Plain counter; a poisoned lock still holds a usable value.
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache `config` unless a local save or reset happened after `seen`.
    /// Returns false when the cache was left alone for that reason.
    fn cache_if_unchanged(&self, seen: u64, config: &SectionConfig<C>) -> bool {
        let generation = self.lock_generation();
        if *generation != seen {
            return false;
        }
        self.cache_quietly(config);
        drop(generation);
        true
    }

    fn cache_quietly(&self, config: &SectionConfig<C>) {
        let written = serde_json::to_string(config)
            .map_err(|e| e.to_string())
            .and_then(|text| self.cache.write(&self.spec.storage_key, &text).map_err(|e| e.to_string()));
        if let Err(e) = written {
            debug!(key = %self.spec.storage_key, error = %e, "could not cache remote config");
        }
    }

    fn emit(&self, event: StoreEvent) {
        debug!(event = %self.event_name(event), "store event");
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(event);
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
