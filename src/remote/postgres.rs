//! Direct Postgres access to `site_configs` via `sqlx`.
//!
//! Used when the service runs next to the database (or against the hosted
//! project's connection string) instead of going through PostgREST. The
//! upsert uses the same conflict target as the REST path, `key`.

use sqlx::PgPool;

use super::{RemoteError, RemoteRow, RemoteTable};

#[derive(Debug, Clone)]
pub struct PgSiteConfigs {
    pool: PgPool,
}

impl PgSiteConfigs {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RemoteTable for PgSiteConfigs {
    async fn fetch(&self, key: &str) -> Result<Option<RemoteRow>, RemoteError> {
        let row = sqlx::query_as::<_, (serde_json::Value, String)>(
            "SELECT content, to_json(updated_at) #>> '{}'
             FROM site_configs
             WHERE key = $1
             LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(content, updated_at)| RemoteRow { key: key.to_owned(), content, updated_at }))
    }

    async fn upsert(&self, row: &RemoteRow) -> Result<(), RemoteError> {
        sqlx::query(
            "INSERT INTO site_configs (key, content, updated_at)
             VALUES ($1, $2, COALESCE(NULLIF($3, '')::timestamptz, now()))
             ON CONFLICT (key) DO UPDATE
             SET content = EXCLUDED.content, updated_at = EXCLUDED.updated_at",
        )
        .bind(&row.key)
        .bind(&row.content)
        .bind(&row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
