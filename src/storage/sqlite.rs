//! SQLite-backed key-value store.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{open_pool, KvBackend, Pool};
use crate::error::{StoreError, StoreResult};

/// Durable backend: one row per key in `kv_store`.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: Pool,
    quota_bytes: Option<u64>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("quota_bytes", &self.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    pub fn new(pool: Pool, quota_bytes: Option<u64>) -> Self {
        Self { pool, quota_bytes }
    }

    pub fn open(path: &Path, quota_bytes: Option<u64>) -> StoreResult<Self> {
        debug!(path = %path.display(), ?quota_bytes, "Opening sqlite key-value store");
        Ok(Self::new(open_pool(path)?, quota_bytes))
    }
}

impl KvBackend for SqliteBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        if let Some(quota) = self.quota_bytes {
            let others: i64 = tx.query_row(
                "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
                 FROM kv_store WHERE key != ?1",
                params![key],
                |row| row.get(0),
            )?;
            let needed = others.max(0) as u64 + (key.len() + value.len()) as u64;
            if needed > quota {
                // Dropping the transaction rolls back; nothing was written.
                return Err(StoreError::Backend(format!(
                    "quota exceeded: {} of {} bytes",
                    needed, quota
                )));
            }
        }

        tx.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for r in rows {
            keys.push(r?);
        }
        Ok(keys)
    }
}
