//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueHint};

use crate::config::validate_config_path;

/// Build the dcli release artifacts for one version.
#[derive(Parser, Debug)]
#[command(
    name = "dcli_release",
    version = crate::VERSION,
    about = "Build and package the dcli release artifacts",
    long_about = "Builds the default and Chinese-locale dcli binaries, renames them to \
                  dcli_<version>-x86_64-unknown-linux-gnu and \
                  dcli-zh-CN_<version>-x86_64-unknown-linux-gnu, then produces the \
                  matching Debian packages. Stops at the first failing step."
)]
pub struct Args {
    /// Release version interpolated into every artifact filename
    #[arg(value_name = "VERSION")]
    pub release_version: String,

    /// Settings file (.toml or .json) overriding the toolchain, binary name or workspace
    #[arg(long, value_parser = parse_config_path, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print the commands and target filenames without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Directory for session logs (defaults to ./logs)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub log_dir: Option<PathBuf>,
}

fn parse_config_path(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    validate_config_path(&path).map_err(|e| e.to_string())?;
    Ok(path)
}
