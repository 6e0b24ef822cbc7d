//! Supabase PostgREST client for `site_configs`.
//!
//! Thin HTTP wrapper. Fetch is a filtered `GET` limited to one row; upsert
//! is a `POST` with `on_conflict=key` and `resolution=merge-duplicates`,
//! which PostgREST turns into `INSERT … ON CONFLICT (key) DO UPDATE`.
//! Pure parsing in `parse_fetch_response` for testability.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{RemoteError, RemoteRow, RemoteTable, SITE_CONFIGS_TABLE};
use crate::config::RemoteTimeouts;

const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=minimal";

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseRest {
    http: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl SupabaseRest {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: String, timeouts: RemoteTimeouts) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| RemoteError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, table_url: table_url(base_url, SITE_CONFIGS_TABLE), api_key })
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }
}

#[async_trait::async_trait]
impl RemoteTable for SupabaseRest {
    async fn fetch(&self, key: &str) -> Result<Option<RemoteRow>, RemoteError> {
        let key_filter = format!("eq.{key}");
        let response = self
            .authed(self.http.get(&self.table_url))
            .query(&[("select", "content,updated_at"), ("key", key_filter.as_str()), ("limit", "1")])
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        if status != 200 {
            return Err(RemoteError::Response { status, body: text });
        }

        parse_fetch_response(key, &text)
    }

    async fn upsert(&self, row: &RemoteRow) -> Result<(), RemoteError> {
        let body = UpsertRow { key: &row.key, content: &row.content, updated_at: &row.updated_at };
        let response = self
            .authed(self.http.post(&self.table_url))
            .query(&[("on_conflict", "key")])
            .header("Prefer", UPSERT_PREFER)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Response { status: status.as_u16(), body })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct UpsertRow<'a> {
    key: &'a str,
    content: &'a serde_json::Value,
    updated_at: &'a str,
}

#[derive(Deserialize)]
struct FetchedRow {
    content: serde_json::Value,
    #[serde(default)]
    updated_at: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{table}", base_url.trim_end_matches('/'))
}

fn parse_fetch_response(key: &str, json: &str) -> Result<Option<RemoteRow>, RemoteError> {
    let rows: Vec<FetchedRow> = serde_json::from_str(json).map_err(|e| RemoteError::Parse(e.to_string()))?;
    Ok(rows.into_iter().next().map(|row| RemoteRow {
        key: key.to_owned(),
        content: row.content,
        updated_at: row.updated_at.unwrap_or_default(),
    }))
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
