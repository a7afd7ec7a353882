//! Platform settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, PlatformResult};

/// Environment variable overriding [`PlatformSettings::log_level`].
pub const LOG_LEVEL_ENV: &str = "STRATUM_LOG_LEVEL";

pub const DEFAULT_TEMP_PREFIX: &str = ".stratum";

/// Settings applied to a [`Platform`](crate::Platform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Minimum level of engine log lines written to stdout
    pub log_level: Option<String>,
    /// Prefix of the temporary directories code is materialized into
    pub temp_prefix: String,
    /// State file read on startup and written after every apply
    pub state_path: Option<PathBuf>,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            log_level: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            state_path: None,
        }
    }
}

impl PlatformSettings {
    pub fn from_yaml(yaml: &str) -> PlatformResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PlatformError::Settings(e.to_string()))
    }

    /// Load a YAML settings file, then apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> PlatformResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_log_level_override(std::env::var(LOG_LEVEL_ENV).ok())
    }

    fn with_log_level_override(mut self, level: Option<String>) -> Self {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.log_level = Some(level);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings = PlatformSettings::from_yaml("log_level: debug\n").unwrap();

        assert_eq!(settings.log_level.as_deref(), Some("debug"));
        assert_eq!(settings.temp_prefix, DEFAULT_TEMP_PREFIX);
        assert!(settings.state_path.is_none());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = PlatformSettings::from_yaml("temp_prefix: [unclosed").unwrap_err();
        assert!(matches!(err, PlatformError::Settings(_)));
    }

    #[test]
    fn test_log_level_override() {
        let settings = PlatformSettings::default().with_log_level_override(Some("WARN".into()));
        assert_eq!(settings.log_level.as_deref(), Some("WARN"));

        let unchanged = settings.clone().with_log_level_override(Some("  ".into()));
        assert_eq!(unchanged, settings);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratum.yaml");
        fs::write(&path, "temp_prefix: .custom\nstate_path: state.json\n").unwrap();

        let settings = PlatformSettings::from_file(&path).unwrap();

        assert_eq!(settings.temp_prefix, ".custom");
        assert_eq!(settings.state_path, Some(PathBuf::from("state.json")));
    }
}
