//! Workspace settings: schema, validation, and persistence.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::storage::LocalStore;

pub const SETTINGS_KEY: &str = "settings";

const WORKSPACE_MAX_CHARS: usize = 50;
const TIMEOUT_MIN_MS: u64 = 1_000;
const TIMEOUT_MAX_MS: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub workspace: String,
    /// Local directory where test files are saved.
    pub storage: String,
    pub headless_mode: bool,
    pub auto_save: bool,
    pub screenshot_on_failure: bool,
    /// Step timeout in milliseconds.
    pub timeout: u64,
    #[serde(default)]
    pub environments: Environments,
}

/// Base URL per target environment. Empty means unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environments {
    pub development: String,
    pub staging: String,
    pub production: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: "FlowTest Workspace".to_string(),
            storage: "~/Documents/FlowTest".to_string(),
            headless_mode: true,
            auto_save: true,
            screenshot_on_failure: true,
            timeout: 30_000,
            environments: Environments::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn workspace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s\-_]+$").expect("static regex"))
}

fn storage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(/|~|[a-zA-Z]:)").expect("static regex"))
}

fn check_url(
    field: &'static str,
    value: &str,
    message: &'static str,
    errors: &mut Vec<FieldError>,
) {
    if !value.is_empty() && url::Url::parse(value).is_err() {
        errors.push(FieldError { field, message });
    }
}

impl Settings {
    /// Every rule violation, in field order. Empty means valid.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.workspace.is_empty() {
            errors.push(FieldError {
                field: "workspace",
                message: "Workspace name is required",
            });
        } else if self.workspace.chars().count() > WORKSPACE_MAX_CHARS {
            errors.push(FieldError {
                field: "workspace",
                message: "Workspace name must be less than 50 characters",
            });
        } else if !workspace_pattern().is_match(&self.workspace) {
            errors.push(FieldError {
                field: "workspace",
                message: "Workspace name can only contain letters, numbers, spaces, hyphens, and underscores",
            });
        }

        if self.storage.is_empty() {
            errors.push(FieldError {
                field: "storage",
                message: "Storage location is required",
            });
        } else if !storage_pattern().is_match(&self.storage) {
            errors.push(FieldError {
                field: "storage",
                message: "Please enter a valid storage path",
            });
        }

        if self.timeout < TIMEOUT_MIN_MS {
            errors.push(FieldError {
                field: "timeout",
                message: "Timeout must be at least 1000ms",
            });
        } else if self.timeout > TIMEOUT_MAX_MS {
            errors.push(FieldError {
                field: "timeout",
                message: "Timeout must be less than 5 minutes",
            });
        }

        let envs = &self.environments;
        check_url(
            "environments.development",
            &envs.development,
            "Development URL must be a valid URL",
            &mut errors,
        );
        check_url(
            "environments.staging",
            &envs.staging,
            "Staging URL must be a valid URL",
            &mut errors,
        );
        check_url(
            "environments.production",
            &envs.production,
            "Production URL must be a valid URL",
            &mut errors,
        );

        errors
    }

    pub fn validate(&self) -> StoreResult<()> {
        let errors = self.field_errors();
        if errors.is_empty() {
            return Ok(());
        }
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(StoreError::InvalidSettings(joined))
    }
}

/// Loads and saves [`Settings`] under the `settings` key.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: LocalStore,
}

impl SettingsStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Stored settings, or the defaults when none (or unreadable) are stored.
    pub fn load(&self) -> Settings {
        self.store.get_or_else(SETTINGS_KEY, Settings::default)
    }

    /// Validate then persist. Invalid settings are never written.
    pub fn save(&self, settings: &Settings) -> StoreResult<()> {
        settings.validate()?;
        self.store.set(SETTINGS_KEY, settings)?;
        info!(workspace = %settings.workspace, "Saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(settings: &Settings) -> Vec<&'static str> {
        settings.field_errors().into_iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_workspace_rules() {
        let mut s = Settings::default();
        s.workspace = String::new();
        assert_eq!(fields(&s), vec!["workspace"]);

        s.workspace = "a".repeat(51);
        assert_eq!(fields(&s), vec!["workspace"]);

        s.workspace = "a".repeat(50);
        assert!(fields(&s).is_empty());

        s.workspace = "My/Workspace!".to_string();
        assert_eq!(
            s.field_errors()[0].message,
            "Workspace name can only contain letters, numbers, spaces, hyphens, and underscores"
        );

        s.workspace = "team_a - nightly 2".to_string();
        assert!(fields(&s).is_empty());
    }

    #[test]
    fn test_storage_path_rules() {
        let mut s = Settings::default();
        for ok in ["/var/tests", "~/tests", "C:\\Tests", "d:/tests"] {
            s.storage = ok.to_string();
            assert!(fields(&s).is_empty(), "{} should be accepted", ok);
        }
        for bad in ["", "relative/path", "1:/x"] {
            s.storage = bad.to_string();
            assert_eq!(fields(&s), vec!["storage"], "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_timeout_bounds() {
        let mut s = Settings::default();
        s.timeout = 999;
        assert_eq!(fields(&s), vec!["timeout"]);
        s.timeout = 1_000;
        assert!(fields(&s).is_empty());
        s.timeout = 300_000;
        assert!(fields(&s).is_empty());
        s.timeout = 300_001;
        assert_eq!(fields(&s), vec!["timeout"]);
    }

    #[test]
    fn test_environment_urls() {
        let mut s = Settings::default();
        s.environments.staging = "https://staging.example.com".to_string();
        s.environments.production = "not a url".to_string();
        assert_eq!(fields(&s), vec!["environments.production"]);
    }

    #[test]
    fn test_reports_every_failing_field() {
        let s = Settings {
            workspace: String::new(),
            storage: "nowhere".to_string(),
            timeout: 5,
            ..Settings::default()
        };
        let err = s.validate().unwrap_err();
        assert!(matches!(err, StoreError::InvalidSettings(_)));
        assert_eq!(fields(&s), vec!["workspace", "storage", "timeout"]);
    }

    #[test]
    fn test_camel_case_on_disk() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["headlessMode"], true);
        assert_eq!(value["screenshotOnFailure"], true);
        assert_eq!(value["environments"]["development"], "");
    }

    #[test]
    fn test_store_rejects_invalid_without_writing() {
        let store = SettingsStore::new(LocalStore::in_memory());
        let bad = Settings {
            timeout: 0,
            ..Settings::default()
        };
        assert!(store.save(&bad).is_err());
        assert_eq!(store.load(), Settings::default());

        let good = Settings {
            workspace: "QA".to_string(),
            headless_mode: false,
            ..Settings::default()
        };
        store.save(&good).unwrap();
        assert_eq!(store.load(), good);
    }
}
