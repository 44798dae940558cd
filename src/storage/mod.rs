//! Persistent key-value storage -- backends, schema, and the namespaced adapter.

pub mod adapter;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use self::adapter::{LocalStore, KEY_PREFIX};
pub use self::memory::MemoryBackend;
pub use self::sqlite::SqliteBackend;

use std::path::Path;

use crate::error::StoreResult;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// A flat string-to-string store shared with other applications.
///
/// Keys arrive fully namespaced; the backend knows nothing about prefixes
/// or JSON. A failed `write` must leave the previous value in place.
pub trait KvBackend: Send + Sync {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;
    fn write(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> StoreResult<()>;
    /// Every key currently stored, in no particular namespace.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &Path) -> StoreResult<Pool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::error::StoreError::Backend(format!(
                    "failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}
