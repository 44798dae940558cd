//! TOML configuration for the FlowTest record store.
//!
//! Every section has compiled-in defaults, so an empty file (or no file at
//! all) is a valid configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming a config file to load.
pub const CONFIG_ENV: &str = "FLOWTEST_CONFIG";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowtestConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FlowtestConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded flowtest configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path specified by the `FLOWTEST_CONFIG` environment variable.
    /// 2. `flowtest.toml` in the working directory.
    /// 3. Fall back to compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "FLOWTEST_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local_path = Path::new("flowtest.toml");
        if local_path.exists() {
            match Self::load(local_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local_path.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

/// Where records are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. `:memory:` keeps everything in process memory.
    pub db_path: PathBuf,
    /// Upper bound on stored keys plus values, in bytes. `0` disables it.
    pub quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/flowtest.db"),
            // Same budget browsers give local storage per origin.
            quota_bytes: 5 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    pub fn quota(&self) -> Option<u64> {
        (self.quota_bytes > 0).then_some(self.quota_bytes)
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}

/// Simulated latency per operation, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub enabled: bool,
    pub list_tests_ms: u64,
    pub mutate_test_ms: u64,
    pub list_runs_ms: u64,
    pub create_run_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            list_tests_ms: 500,
            mutate_test_ms: 300,
            list_runs_ms: 400,
            create_run_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = FlowtestConfig::default();

        assert_eq!(cfg.storage.db_path, PathBuf::from("data/flowtest.db"));
        assert_eq!(cfg.storage.quota(), Some(5_242_880));
        assert!(!cfg.storage.is_in_memory());

        assert!(!cfg.latency.enabled);
        assert_eq!(cfg.latency.list_tests_ms, 500);
        assert_eq!(cfg.latency.mutate_test_ms, 300);
        assert_eq!(cfg.latency.list_runs_ms, 400);
        assert_eq!(cfg.latency.create_run_ms, 200);

        assert_eq!(cfg.api.bind, "127.0.0.1:8080");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[storage]
db_path = ":memory:"
quota_bytes = 0

[latency]
enabled = true
list_tests_ms = 50

[logging]
format = "json"
"#;
        let cfg: FlowtestConfig = toml::from_str(toml_str).unwrap();
        assert!(cfg.storage.is_in_memory());
        assert_eq!(cfg.storage.quota(), None);
        assert!(cfg.latency.enabled);
        assert_eq!(cfg.latency.list_tests_ms, 50);
        assert_eq!(cfg.latency.mutate_test_ms, 300);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.api.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let cfg: FlowtestConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowtest.toml");
        std::fs::write(&path, "[api]\nbind = \"0.0.0.0:9000\"\n").unwrap();

        let cfg = FlowtestConfig::load(&path).unwrap();
        assert_eq!(cfg.api.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = FlowtestConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
