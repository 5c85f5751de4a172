//! Configuration for release builds.
//!
//! Every field has a default, and the defaults reproduce the stock release
//! procedure: `cargo` in the current directory building the `dcli` binary with
//! the `zh-CN` locale feature for the Chinese variant. A config file (see
//! `loader`) only needs to name the fields it overrides.

pub mod loader;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use loader::{load_config_from_file, validate_config_path};

/// Release build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Toolchain driver invoked for both compiling and packaging
    pub cargo: String,

    /// Name of the binary cargo leaves under `target/release/`
    pub binary_name: String,

    /// Directory the toolchain runs in and artifacts are written to
    pub workspace_dir: PathBuf,

    /// Cargo feature enabling the Chinese locale
    pub locale_feature: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            cargo: "cargo".to_string(),
            binary_name: "dcli".to_string(),
            workspace_dir: PathBuf::from("."),
            locale_feature: "zh-CN".to_string(),
        }
    }
}

impl ReleaseConfig {
    /// Reject settings that would produce unusable command lines or filenames.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cargo.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "cargo program cannot be empty".to_string(),
            ));
        }

        if self.binary_name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "binary_name cannot be empty".to_string(),
            ));
        }

        if self.binary_name.contains('/') || self.binary_name.contains('\\') {
            return Err(ConfigError::ValidationFailed(format!(
                "binary_name must be a bare file name, got '{}'",
                self.binary_name
            )));
        }

        if self.locale_feature.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "locale_feature cannot be empty".to_string(),
            ));
        }

        if self.workspace_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "workspace_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Canonical compiler output, relative to the workspace.
    pub fn release_output(&self) -> PathBuf {
        PathBuf::from("target").join("release").join(&self.binary_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_release() {
        let config = ReleaseConfig::default();
        assert_eq!(config.cargo, "cargo");
        assert_eq!(config.binary_name, "dcli");
        assert_eq!(config.workspace_dir, PathBuf::from("."));
        assert_eq!(config.locale_feature, "zh-CN");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_release_output_path() {
        let config = ReleaseConfig::default();
        assert_eq!(config.release_output(), PathBuf::from("target/release/dcli"));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut config = ReleaseConfig::default();
        config.cargo = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationFailed(_))));

        let mut config = ReleaseConfig::default();
        config.binary_name.clear();
        assert!(config.validate().is_err());

        let mut config = ReleaseConfig::default();
        config.locale_feature.clear();
        assert!(config.validate().is_err());

        let mut config = ReleaseConfig::default();
        config.workspace_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_path_in_binary_name() {
        let mut config = ReleaseConfig::default();
        config.binary_name = "bin/dcli".to_string();
        assert!(config.validate().is_err());
    }
}
