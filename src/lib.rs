//! dcli Release Builder
//!
//! Produces the four distributable artifacts of a dcli release from a single
//! version string: the default and Chinese-locale Linux binaries, renamed to
//! versioned filenames, and the matching Debian packages.
//!
//! The crate is organized into functional modules:
//! - **error**: Unified error type hierarchy and exit code mapping
//! - **models**: Versions, variants, artifact naming and build steps
//! - **config**: Release settings and config file loading
//! - **orchestrator**: Release plan, step execution and state tracking
//! - **log_collector**: Decoupled disk logging behind the `log` facade
//! - **cli**: Command-line arguments

pub mod cli;
pub mod config;
pub mod error;
pub mod log_collector;
pub mod models;
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

pub use config::{load_config_from_file, ReleaseConfig};
pub use error::{BuildError, ConfigError, ReleaseError, Result};
pub use log_collector::{LogCollector, LogLine};
pub use models::{ArtifactKind, BuildStep, Variant, Version};
pub use orchestrator::{release_plan, ProcessRunner, ReleaseOrchestrator};

/// Crate version, reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
