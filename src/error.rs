//! Unified error type hierarchy for the dcli release builder
//!
//! Provides structured error handling with BuildError, ConfigError and the
//! top-level ReleaseError that maps every failure to a process exit code.

use std::io;
use thiserror::Error;

/// Exit code used for every failure that does not carry its own status.
pub const EXIT_FAILURE: u8 = 1;

/// Build step execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The toolchain ran and exited unsuccessfully.
    #[error("Command '{command}' failed: {}", describe_status(.code))]
    CommandFailed { command: String, code: Option<i32> },

    /// The toolchain could not be started at all.
    #[error("Failed to spawn '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// The compiler did not leave its output at the expected path.
    #[error("Expected build output missing: {0}")]
    ArtifactMissing(String),

    #[error("Failed to move artifact from {from} to {to}: {reason}")]
    ArtifactMoveFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid step transition: {0}")]
    InvalidTransition(String),

    #[error("IO error during build step: {0}")]
    IoError(#[from] io::Error),
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type returned by a release run.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ReleaseError {
    /// Process exit code for this failure.
    ///
    /// A failed toolchain command propagates its own exit status; anything
    /// else (signals, filesystem and configuration errors) exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReleaseError::Build(BuildError::CommandFailed {
                code: Some(code), ..
            }) => u8::try_from(*code)
                .ok()
                .filter(|c| *c != 0)
                .unwrap_or(EXIT_FAILURE),
            _ => EXIT_FAILURE,
        }
    }

    /// Get a user-facing error message suitable for console output
    pub fn user_message(&self) -> String {
        match self {
            ReleaseError::Config(e) => format!("Configuration error: {}", e),
            ReleaseError::Build(BuildError::ArtifactMissing(path)) => format!(
                "Build output not found at {} (did the compiler place it elsewhere?)",
                path
            ),
            ReleaseError::Build(e) => format!("Release build aborted: {}", e),
        }
    }
}

fn describe_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Top-level result type for release operations.
pub type Result<T> = std::result::Result<T, ReleaseError>;
