//! Error types shared by the storage adapter and the record service.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend did not accept a write (quota exceeded, I/O, serialization).
    #[error("failed to save data under `{key}`: {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Stored ids already reach the largest representable value.
    #[error("no {kind} id left above the stored ones")]
    IdsExhausted { kind: &'static str },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Short machine-readable tag used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageWrite { .. } => "storage_write",
            Self::NotFound { .. } => "not_found",
            Self::Backend(_) => "backend",
            Self::InvalidSettings(_) => "invalid_settings",
            Self::IdsExhausted { .. } => "ids_exhausted",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found("Test", "42");
        assert_eq!(err.to_string(), "Test not found: 42");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_storage_write_message() {
        let err = StoreError::StorageWrite {
            key: "tests".to_string(),
            reason: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("`tests`"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_ids_exhausted_message() {
        let err = StoreError::IdsExhausted { kind: "test" };
        assert_eq!(err.to_string(), "no test id left above the stored ones");
        assert_eq!(err.kind(), "ids_exhausted");
    }
}
