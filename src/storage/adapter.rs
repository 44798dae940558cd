//! Namespaced JSON adapter over a [`KvBackend`].
//!
//! Every key this crate writes is stored as `KEY_PREFIX + key`, so several
//! applications can share one backend and [`LocalStore::clear`] only ever
//! removes our own entries. Values are JSON text.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::{KvBackend, MemoryBackend};
use crate::error::{StoreError, StoreResult};

/// Namespace prepended to every logical key.
pub const KEY_PREFIX: &str = "flowtest-";

#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KvBackend>,
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("prefix", &KEY_PREFIX)
            .finish_non_exhaustive()
    }
}

fn namespaced(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// On failure the previous value under `key` is left untouched.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let text = serde_json::to_string(value).map_err(|e| StoreError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        self.backend.write(&namespaced(key), &text).map_err(|e| {
            error!(key, error = %e, "Failed to save to store");
            let reason = match e {
                StoreError::Backend(msg) => msg,
                other => other.to_string(),
            };
            StoreError::StorageWrite {
                key: key.to_string(),
                reason,
            }
        })?;

        debug!(key, bytes = text.len(), "Stored value");
        Ok(())
    }

    /// Read `key`, falling back to `default` when it is absent or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_or_else(key, || default)
    }

    /// Like [`LocalStore::get`], building the default only when needed.
    pub fn get_or_else<T, F>(&self, key: &str, default: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.backend.read(&namespaced(key)) {
            Ok(None) => default(),
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key, error = %e, "Corrupted value in store, using default");
                    default()
                }
            },
            Err(e) => {
                warn!(key, error = %e, "Failed to read from store, using default");
                default()
            }
        }
    }

    pub fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.backend.read(&namespaced(key))?.is_some())
    }

    /// Delete `key`. Missing keys are not an error.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.backend.delete(&namespaced(key)).map_err(|e| {
            error!(key, error = %e, "Failed to remove from store");
            e
        })
    }

    /// Logical keys (prefix stripped) currently held by this namespace.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect())
    }

    /// Delete every key in this namespace, returning how many were removed.
    pub fn clear(&self) -> StoreResult<usize> {
        let owned: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(KEY_PREFIX))
            .collect();

        for key in &owned {
            self.backend.delete(key)?;
        }

        debug!(removed = owned.len(), "Cleared store namespace");
        Ok(owned.len())
    }
}
