//! Shared test fixtures: a recording toolchain stand-in.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dcli_release::error::BuildError;
use dcli_release::models::{ArtifactKind, BuildStep};
use dcli_release::orchestrator::{CommandRunner, CommandStatus};
use dcli_release::{ReleaseConfig, ReleaseOrchestrator, Version};
use futures::future::{BoxFuture, FutureExt};

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Behaves like cargo/cargo-deb: binary steps leave output under
/// `target/release/`, package steps write the `-o` file.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub invocations: Arc<Mutex<Vec<Invocation>>>,
    /// Step name and exit code of a step that fails
    pub fail: Option<(String, i32)>,
    /// Step name that exits 0 without producing output
    pub skip_output: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    pub fn failing(step: &str, code: i32) -> Self {
        RecordingRunner {
            fail: Some((step.to_string(), code)),
            ..RecordingRunner::default()
        }
    }

    pub fn silent_on(step: &str) -> Self {
        RecordingRunner {
            skip_output: Some(step.to_string()),
            ..RecordingRunner::default()
        }
    }

    pub fn recorded(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Contents written for a step's output, so relocations can be traced.
    pub fn payload(step: &BuildStep) -> String {
        format!("{} build of {}", step.name(), step.variant.as_str())
    }

    fn produce(step: &BuildStep, workspace: &Path) -> std::io::Result<()> {
        let path = match (&step.kind, &step.expected_output) {
            (ArtifactKind::Binary, Some(output)) => workspace.join(output),
            _ => workspace.join(&step.target_filename),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, RecordingRunner::payload(step))
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(
        &'a self,
        step: &'a BuildStep,
        workspace: &'a Path,
    ) -> BoxFuture<'a, Result<CommandStatus, BuildError>> {
        async move {
            self.invocations.lock().unwrap().push(Invocation {
                program: step.program.clone(),
                args: step.args.clone(),
                cwd: workspace.to_path_buf(),
            });

            if let Some((name, code)) = &self.fail {
                if *name == step.name() {
                    return Ok(CommandStatus::from_code(*code));
                }
            }
            if self.skip_output.as_deref() != Some(step.name().as_str()) {
                RecordingRunner::produce(step, workspace).map_err(BuildError::from)?;
            }
            Ok::<_, BuildError>(CommandStatus::from_code(0))
        }
        .boxed()
    }
}

pub fn config_for(workspace: &Path) -> ReleaseConfig {
    ReleaseConfig {
        workspace_dir: workspace.to_path_buf(),
        ..ReleaseConfig::default()
    }
}

pub fn orchestrator(workspace: &Path, version: &str, runner: &RecordingRunner) -> ReleaseOrchestrator {
    ReleaseOrchestrator::new(
        Version::new(version),
        config_for(workspace),
        Box::new(runner.clone()),
    )
}

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
