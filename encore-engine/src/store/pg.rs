use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool, Row};

use super::{Result, StoreError, VenueStore};

/// A postgres venue store, keeping every entry in a single `kv_entries` table
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL,
                expires_at TIMESTAMPTZ
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| e.any())?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl VenueStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query(
            "SELECT value FROM kv_entries
             WHERE key = $1 AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn put(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES ($1, $2, $3)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool> {
        // The update arm only fires for expired leftovers, so a live entry
        // results in zero affected rows
        let result = sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES ($1, $2, NULL)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, expires_at = NULL
             WHERE kv_entries.expires_at IS NOT NULL AND kv_entries.expires_at <= now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(result.rows_affected() == 1)
    }

    async fn incr(&self, key: &str, by: i64) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at)
             VALUES ($1, to_jsonb($2::bigint), NULL)
             ON CONFLICT (key) DO UPDATE
             SET value = to_jsonb(COALESCE((kv_entries.value #>> '{}')::bigint, 0) + $2),
                 expires_at = NULL
             RETURNING (value #>> '{}')::bigint AS count",
        )
        .bind(key)
        .bind(by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.get("count"))
    }

    async fn incr_field(&self, key: &str, field: &str, by: i64) -> Result<Option<i64>> {
        let row = sqlx::query(
            "UPDATE kv_entries
             SET value = jsonb_set(value, ARRAY[$2], to_jsonb(COALESCE((value ->> $2)::bigint, 0) + $3))
             WHERE key = $1 AND (expires_at IS NULL OR expires_at > now())
             RETURNING (value ->> $2)::bigint AS count",
        )
        .bind(key)
        .bind(field)
        .bind(by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.map(|r| r.get("count")))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(result.rows_affected() > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        // Escape LIKE wildcards so opaque ids cannot widen the match
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");

        let rows = sqlx::query(
            "SELECT key, value FROM kv_entries
             WHERE key LIKE $1 ESCAPE '\\'
               AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(format!("{}%", escaped))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("key"), r.get("value")))
            .collect())
    }
}

/// Helper trait to reduce boilerplate
trait IntoStoreError {
    fn any(self) -> StoreError;
}

impl IntoStoreError for SqlxError {
    fn any(self) -> StoreError {
        StoreError::Internal(Box::new(self))
    }
}
