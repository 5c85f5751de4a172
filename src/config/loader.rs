//! Config file loader.
//!
//! Accepts `.toml` and `.json` files; the extension picks the parser.

use super::ReleaseConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

/// Load and validate a config from file.
pub fn load_config_from_file(path: &Path) -> Result<ReleaseConfig, ConfigError> {
    let format = detect_format(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: ReleaseConfig = match format {
        ConfigFormat::Toml => toml::from_str(&content)?,
        ConfigFormat::Json => serde_json::from_str(&content)?,
    };

    config.validate()?;
    log::debug!("Loaded release config from {}: {:?}", path.display(), config);
    Ok(config)
}

/// Pick the parser from the file extension.
fn detect_format(path: &Path) -> Result<ConfigFormat, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(ConfigFormat::Toml),
        Some("json") => Ok(ConfigFormat::Json),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .toml or .json extension, got .{}",
            ext
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .toml or .json extension".to_string(),
        )),
    }
}

/// Validate config path (.toml or .json extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    detect_format(path).map(|_| ())
}
