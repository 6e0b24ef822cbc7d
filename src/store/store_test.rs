use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use super::cache::{KeyValueStore, MemoryStore};
use super::*;
use crate::cards::{MarketTag, SolutionCard, markets, solutions};
use crate::remote::{MemoryTable, RemoteError};

// =============================================================================
// HELPERS
// =============================================================================

fn market_spec() -> StoreSpec<MarketTag> {
    markets::store_spec()
}

fn tag(id: &str, order: i32) -> MarketTag {
    MarketTag {
        id: id.to_owned(),
        label: id.to_uppercase(),
        slug: id.to_owned(),
        enabled: true,
        order: f64::from(order),
        extra: serde_json::Map::new(),
    }
}

fn custom_markets(items: Vec<MarketTag>) -> SectionConfig<MarketTag> {
    SectionConfig {
        section_title: "Custom".to_owned(),
        section_subtitle: "Edited in admin".to_owned(),
        items,
        updated_at: String::new(),
    }
}

/// Store over a shared memory backend so tests can poke at raw storage.
fn market_store() -> (ConfigStore<MarketTag>, Arc<MemoryStore>, Arc<MemoryTable>) {
    let backend = Arc::new(MemoryStore::new());
    let table = Arc::new(MemoryTable::new());
    let cache = LocalCache::new(backend.clone(), cache::DEFAULT_CACHE_MAX_BYTES);
    let store = ConfigStore::new(market_spec(), cache, Some(table.clone() as Arc<dyn RemoteTable>));
    (store, backend, table)
}

fn drain(rx: &mut broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

struct FailingRemote;

#[async_trait::async_trait]
impl RemoteTable for FailingRemote {
    async fn fetch(&self, _key: &str) -> Result<Option<RemoteRow>, RemoteError> {
        Err(RemoteError::Response { status: 401, body: "invalid api key".to_owned() })
    }

    async fn upsert(&self, _row: &RemoteRow) -> Result<(), RemoteError> {
        Err(RemoteError::Request("connection reset".to_owned()))
    }
}

// =============================================================================
// READ PATH
// =============================================================================

#[test]
fn empty_cache_reads_none_and_falls_back_to_defaults() {
    let (store, _, _) = market_store();
    assert!(store.get_config().is_none());
    assert_eq!(store.safe_get_config_or_defaults(), markets::default_config());
}

#[test]
fn corrupt_cache_reads_none() {
    let (store, backend, _) = market_store();
    backend.set(markets::STORAGE_KEY, "{not-json").unwrap();
    assert!(store.get_config().is_none());
    assert_eq!(store.safe_get_config_or_defaults(), markets::default_config());
}

#[test]
fn structurally_invalid_cache_reads_none() {
    let (store, backend, _) = market_store();
    backend
        .set(markets::STORAGE_KEY, r#"{"sectionTitle":"x","sectionSubtitle":"y","items":[{"id":1}]}"#)
        .unwrap();
    assert!(store.get_config().is_none());
}

#[test]
fn cached_config_is_normalized_on_read() {
    let (store, backend, _) = market_store();
    let raw = json!({
        "sectionTitle": "x",
        "sectionSubtitle": "y",
        "items": [
            {"id": "b", "label": "B", "slug": "b", "enabled": true, "order": 9},
            {"id": "b", "label": "B2", "slug": "b", "enabled": true, "order": 4}
        ]
    });
    backend.set(markets::STORAGE_KEY, &raw.to_string()).unwrap();

    let config = store.get_config().unwrap();
    let ids: Vec<&str> = config.items.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "b-1"]);
    assert_eq!(config.items[0].label, "B2");
}

#[test]
fn detached_cache_short_circuits() {
    let store = ConfigStore::new(market_spec(), LocalCache::detached(), None);
    let mut rx = store.subscribe();
    assert!(store.get_config().is_none());
    assert!(!store.save_config(&custom_markets(vec![tag("a", 0)])));
    store.reset_to_defaults();
    assert_eq!(store.safe_get_config_or_defaults(), markets::default_config());
    assert!(drain(&mut rx).is_empty());
}

// =============================================================================
// SAVE / RESET
// =============================================================================

#[test]
fn save_then_get_returns_normalized_config() {
    let (store, _, _) = market_store();
    let input = custom_markets(vec![tag("c", 10), tag("a", 2), tag("b", 5)]);

    assert!(store.save_config(&input));
    let mut loaded = store.get_config().unwrap();
    assert!(!loaded.updated_at.is_empty());
    loaded.updated_at = String::new();

    assert_eq!(loaded, input.normalized());
    let orders: Vec<f64> = loaded.items.iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0.0, 1.0, 2.0]);
}

#[test]
fn save_stamps_rfc3339_timestamp() {
    let (store, _, _) = market_store();
    assert!(store.save_config(&custom_markets(vec![])));
    let stamped = store.get_config().unwrap().updated_at;
    assert!(OffsetDateTime::parse(&stamped, &Rfc3339).is_ok(), "bad timestamp: {stamped}");
}

#[test]
fn save_dedupes_ids_by_order() {
    let (store, _, _) = market_store();
    let input = custom_markets(vec![tag("dup", 1), tag("dup", 0)]);
    assert!(store.save_config(&input));

    let stored = store.get_config().unwrap();
    let pairs: Vec<(&str, f64)> = stored.items.iter().map(|t| (t.id.as_str(), t.order)).collect();
    assert_eq!(pairs, vec![("dup", 0.0), ("dup-1", 1.0)]);
}

#[test]
fn save_writes_normalized_json_to_storage() {
    let (store, backend, _) = market_store();
    assert!(store.save_config(&custom_markets(vec![tag("x", 7), tag("x", 3)])));

    let raw: serde_json::Value = serde_json::from_str(&backend.get(markets::STORAGE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw["items"][0]["order"], 0);
    assert_eq!(raw["items"][1]["id"], "x-1");
    assert!(raw["updatedAt"].is_string());
}

#[test]
fn save_emits_updated() {
    let (store, _, _) = market_store();
    let mut rx = store.subscribe();
    assert!(store.save_config(&custom_markets(vec![tag("a", 0)])));
    assert_eq!(drain(&mut rx), vec![StoreEvent::Updated]);
    assert_eq!(store.event_name(StoreEvent::Updated), "markets:updated");
}

#[test]
fn oversized_save_fails_without_touching_previous_value() {
    let backend = Arc::new(MemoryStore::new());
    let store = ConfigStore::new(market_spec(), LocalCache::new(backend.clone(), 2048), None);
    let mut rx = store.subscribe();

    assert!(store.save_config(&custom_markets(vec![tag("keep", 0)])));
    let before = backend.get(markets::STORAGE_KEY).unwrap();

    let huge = custom_markets((0..200).map(|i| tag(&format!("market-number-{i}"), i)).collect());
    assert!(!store.save_config(&huge));

    assert_eq!(backend.get(markets::STORAGE_KEY).unwrap(), before);
    assert_eq!(store.get_config().unwrap().items[0].id, "keep");
    assert_eq!(drain(&mut rx), vec![StoreEvent::Updated, StoreEvent::SaveFailed]);
    assert_eq!(store.event_name(StoreEvent::SaveFailed), "markets:save_failed");
}

#[test]
fn backend_quota_failure_reports_save_failed() {
    let cache = LocalCache::new(Arc::new(MemoryStore::with_quota(64)), cache::DEFAULT_CACHE_MAX_BYTES);
    let store = ConfigStore::new(market_spec(), cache, None);
    let mut rx = store.subscribe();

    assert!(!store.save_config(&markets::default_config()));
    assert!(store.get_config().is_none());
    assert_eq!(drain(&mut rx), vec![StoreEvent::SaveFailed]);
}

#[test]
fn reset_drops_custom_config() {
    let (store, _, _) = market_store();
    let custom = custom_markets(vec![tag("only", 0)]);
    assert!(store.save_config(&custom));

    store.reset_to_defaults();

    assert!(store.get_config().is_none());
    assert_eq!(store.safe_get_config_or_defaults(), markets::default_config());
}

#[tokio::test]
async fn reset_leaves_remote_untouched() {
    let (store, _, table) = market_store();
    assert!(store.save_to_supabase(&custom_markets(vec![tag("cloud", 0)])).await);
    store.reset_to_defaults();
    assert_eq!(table.len().await, 1);
}

// =============================================================================
// IMPORT / EXPORT
// =============================================================================

#[test]
fn export_is_pretty_printed_defaults_when_empty() {
    let (store, _, _) = market_store();
    let payload = store.export_config();

    assert_eq!(payload.mime, "application/json");
    assert_eq!(payload.file_name, "markets-config.json");
    assert!(payload.body.contains("\n  \"sectionTitle\""));
    let parsed: SectionConfig<MarketTag> = serde_json::from_str(&payload.body).unwrap();
    assert_eq!(parsed, markets::default_config());
}

#[test]
fn export_then_import_restores_config() {
    let (source, _, _) = market_store();
    assert!(source.save_config(&custom_markets(vec![tag("b", 1), tag("a", 0)])));
    let payload = source.export_config();

    let (target, _, _) = market_store();
    assert_eq!(target.import_config(&payload.body), ImportOutcome { success: true, error: None });

    let mut left = source.get_config().unwrap();
    let mut right = target.get_config().unwrap();
    left.updated_at.clear();
    right.updated_at.clear();
    assert_eq!(left, right);
}

#[test]
fn import_accepts_fractional_orders_and_keeps_extra_fields() {
    let (store, _, _) = market_store();
    let text = r#"{"sectionTitle":"T","sectionSubtitle":"S","items":[
        {"id":"a","label":"A","slug":"a","enabled":true,"order":2.0,"color":"red"},
        {"id":"b","label":"B","slug":"b","enabled":true,"order":0.5}
    ]}"#;

    assert_eq!(store.import_config(text), ImportOutcome::ok());
    let loaded = store.get_config().unwrap();
    let ids: Vec<&str> = loaded.items.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(loaded.items[1].extra["color"], "red");
}

#[test]
fn import_rejects_bad_json() {
    let (store, _, _) = market_store();
    let outcome = store.import_config("{oops");
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Invalid JSON format"));
    assert!(store.get_config().is_none());
}

#[test]
fn import_rejects_wrong_shape() {
    let (store, _, _) = market_store();
    let outcome = store.import_config(r#"{"sectionTitle": 1, "items": []}"#);
    assert_eq!(outcome.error.as_deref(), Some("Invalid configuration format"));
    assert!(store.get_config().is_none());
}

#[test]
fn import_reports_failed_save() {
    let store = ConfigStore::new(market_spec(), LocalCache::new(Arc::new(MemoryStore::new()), 10), None);
    let text = serde_json::to_string(&markets::default_config()).unwrap();
    let outcome = store.import_config(&text);
    assert_eq!(outcome.error.as_deref(), Some("Failed to save configuration"));
}

#[test]
fn import_outcome_serializes_without_null_error() {
    let json = serde_json::to_value(ImportOutcome::ok()).unwrap();
    assert_eq!(json, json!({"success": true}));
}

// =============================================================================
// generate_id
// =============================================================================

#[test]
fn generate_id_suffixes_on_collision() {
    let (store, _, _) = market_store();
    assert!(store.save_config(&custom_markets(vec![tag("test-title", 0)])));
    assert_eq!(store.generate_id("Test Title"), "test-title-1");
    assert_eq!(store.generate_id("Brand New"), "brand-new");
}

#[test]
fn generate_id_checks_defaults_when_nothing_cached() {
    let (store, _, _) = market_store();
    assert_eq!(store.generate_id("Cafes"), "cafes-1");
}

#[test]
fn generate_id_does_not_write() {
    let (store, backend, _) = market_store();
    let mut rx = store.subscribe();
    let _ = store.generate_id("Anything");
    assert!(backend.get(markets::STORAGE_KEY).unwrap().is_none());
    assert!(drain(&mut rx).is_empty());
}

// =============================================================================
// REMOTE
// =============================================================================

#[tokio::test]
async fn fetch_without_remote_is_none() {
    let store = ConfigStore::new(market_spec(), LocalCache::in_memory(), None);
    assert!(store.fetch_from_supabase().await.is_none());
    assert!(!store.save_to_supabase(&markets::default_config()).await);
}

#[tokio::test]
async fn fetch_missing_row_is_none() {
    let (store, _, _) = market_store();
    assert!(store.fetch_from_supabase().await.is_none());
}

#[tokio::test]
async fn remote_config_overrides_local_and_is_cached() {
    let (store, _, table) = market_store();
    assert!(store.save_config(&custom_markets(vec![tag("local", 0)])));

    table
        .upsert(&RemoteRow {
            key: markets::LOGICAL_NAME.to_owned(),
            content: json!({
                "sectionTitle": "Cloud",
                "sectionSubtitle": "from remote",
                "items": [
                    {"id": "late", "label": "Late", "slug": "late", "enabled": true, "order": 3},
                    {"id": "early", "label": "Early", "slug": "early", "enabled": true, "order": 1}
                ]
            }),
            updated_at: "2026-10-16T08:00:00+00:00".to_owned(),
        })
        .await
        .unwrap();

    let fetched = store.fetch_from_supabase().await.unwrap();
    let pairs: Vec<(&str, f64)> = fetched.items.iter().map(|t| (t.id.as_str(), t.order)).collect();
    assert_eq!(pairs, vec![("early", 0.0), ("late", 1.0)]);
    assert_eq!(fetched.updated_at, "2026-10-16T08:00:00+00:00");

    assert_eq!(store.get_config().unwrap(), fetched);
}

#[tokio::test]
async fn invalid_remote_content_is_none_and_keeps_local() {
    let (store, _, table) = market_store();
    assert!(store.save_config(&custom_markets(vec![tag("local", 0)])));
    table
        .upsert(&RemoteRow {
            key: markets::LOGICAL_NAME.to_owned(),
            content: json!({"sectionTitle": "x", "items": "nope"}),
            updated_at: String::new(),
        })
        .await
        .unwrap();

    assert!(store.fetch_from_supabase().await.is_none());
    assert_eq!(store.get_config().unwrap().items[0].id, "local");
}

#[tokio::test]
async fn remote_errors_map_to_none_and_false() {
    let store = ConfigStore::new(market_spec(), LocalCache::in_memory(), Some(Arc::new(FailingRemote) as Arc<dyn RemoteTable>));
    let mut rx = store.subscribe();

    assert!(store.fetch_from_supabase().await.is_none());
    assert!(!store.save_to_supabase(&markets::default_config()).await);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn fetch_still_returns_config_when_cache_write_fails() {
    let table = Arc::new(MemoryTable::new());
    let cache = LocalCache::new(Arc::new(MemoryStore::new()), 16);
    let store = ConfigStore::new(market_spec(), cache, Some(table.clone() as Arc<dyn RemoteTable>));

    table
        .upsert(&RemoteRow {
            key: markets::LOGICAL_NAME.to_owned(),
            content: serde_json::to_value(markets::default_config()).unwrap(),
            updated_at: "2026-10-16T08:00:00+00:00".to_owned(),
        })
        .await
        .unwrap();

    let fetched = store.fetch_from_supabase().await.unwrap();
    assert_eq!(fetched.items.len(), markets::default_config().items.len());
    assert!(store.get_config().is_none());
}

#[tokio::test]
async fn save_to_supabase_upserts_normalized_row_by_logical_name() {
    let (store, _, table) = market_store();
    let mut rx = store.subscribe();

    assert!(store.save_to_supabase(&custom_markets(vec![tag("dup", 4), tag("dup", 2)])).await);
    assert!(store.save_to_supabase(&custom_markets(vec![tag("second", 0)])).await);

    assert_eq!(table.len().await, 1);
    let row = table.fetch(markets::LOGICAL_NAME).await.unwrap().unwrap();
    assert_eq!(row.content["items"][0]["id"], "second");
    assert_eq!(row.content["updatedAt"], json!(row.updated_at));
    assert_eq!(drain(&mut rx), vec![StoreEvent::Updated, StoreEvent::Updated]);
}

#[tokio::test]
async fn publish_then_fetch_round_trips_through_remote() {
    let (store, _, _) = market_store();
    assert!(store.save_to_supabase(&custom_markets(vec![tag("dup", 1), tag("dup", 0)])).await);

    let fetched = store.fetch_from_supabase().await.unwrap();
    let ids: Vec<&str> = fetched.items.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["dup", "dup-1"]);
}

/// Remote whose fetch lets the test run a local save mid-flight.
struct SlowRemote {
    row: RemoteRow,
    gate: tokio::sync::Notify,
}

#[async_trait::async_trait]
impl RemoteTable for SlowRemote {
    async fn fetch(&self, _key: &str) -> Result<Option<RemoteRow>, RemoteError> {
        self.gate.notified().await;
        Ok(Some(self.row.clone()))
    }

    async fn upsert(&self, _row: &RemoteRow) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[tokio::test]
async fn stale_fetch_does_not_overwrite_newer_local_save() {
    let remote = Arc::new(SlowRemote {
        row: RemoteRow {
            key: markets::LOGICAL_NAME.to_owned(),
            content: serde_json::to_value(custom_markets(vec![tag("remote", 0)])).unwrap(),
            updated_at: String::new(),
        },
        gate: tokio::sync::Notify::new(),
    });
    let store = Arc::new(ConfigStore::new(
        market_spec(),
        LocalCache::in_memory(),
        Some(remote.clone() as Arc<dyn RemoteTable>),
    ));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_from_supabase().await }
    });
    tokio::task::yield_now().await;

    assert!(store.save_config(&custom_markets(vec![tag("local", 0)])));
    remote.gate.notify_one();

    let fetched = pending.await.unwrap().unwrap();
    assert_eq!(fetched.items[0].id, "remote");
    assert_eq!(store.get_config().unwrap().items[0].id, "local");
}

#[test]
fn remote_cache_write_requires_unchanged_generation() {
    let (store, _, _) = market_store();
    let seen = *store.lock_generation();

    assert!(store.save_config(&custom_markets(vec![tag("local", 0)])));
    assert!(!store.cache_if_unchanged(seen, &custom_markets(vec![tag("remote", 0)])));
    assert_eq!(store.get_config().unwrap().items[0].id, "local");

    let current = *store.lock_generation();
    assert!(store.cache_if_unchanged(current, &custom_markets(vec![tag("remote", 0)])));
    assert_eq!(store.get_config().unwrap().items[0].id, "remote");
}

#[test]
fn reset_and_failed_saves_bump_generation_only_on_change() {
    let backend = Arc::new(MemoryStore::new());
    let store = ConfigStore::new(market_spec(), LocalCache::new(backend, 16), None);

    let before = *store.lock_generation();
    assert!(!store.save_config(&custom_markets(vec![tag("too-big", 0)])));
    assert_eq!(*store.lock_generation(), before);

    store.reset_to_defaults();
    assert_eq!(*store.lock_generation(), before + 1);
}

// =============================================================================
// OTHER DOMAINS
// =============================================================================

#[test]
fn solutions_store_uses_its_own_key_and_events() {
    let backend = Arc::new(MemoryStore::new());
    let store = ConfigStore::new(
        solutions::store_spec(),
        LocalCache::new(backend.clone(), cache::DEFAULT_CACHE_MAX_BYTES),
        None,
    );

    assert!(store.save_config(&solutions::default_config()));
    assert!(backend.get("aiMaster:solutions").unwrap().is_some());
    assert_eq!(store.event_name(StoreEvent::SaveFailed), "solutions:save_failed");

    let loaded: SectionConfig<SolutionCard> = store.get_config().unwrap();
    assert_eq!(loaded.items.len(), solutions::default_config().items.len());
}
