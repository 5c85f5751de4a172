//! Release Orchestration: four sequential build steps
//! (linux-default -> linux-chinese -> package-default -> package-chinese).
//!
//! Each step announces its artifact, runs one toolchain command to completion
//! and, for the raw binaries, moves the compiler output to its versioned
//! filename. The first failure aborts the run; later steps are never started.

pub mod executor;
pub mod plan;
pub mod state;

use std::path::{Path, PathBuf};

pub use executor::{CommandRunner, CommandStatus, ProcessRunner};
pub use plan::release_plan;
pub use state::{OrchestrationState, StepPhase, StepRecord};

use crate::config::ReleaseConfig;
use crate::error::BuildError;
use crate::models::{BuildStep, Version};
use executor::{clear_stale_output, relocate_artifact};

/// Drives one release run.
pub struct ReleaseOrchestrator {
    config: ReleaseConfig,
    plan: Vec<BuildStep>,
    state: OrchestrationState,
    runner: Box<dyn CommandRunner>,
}

impl ReleaseOrchestrator {
    /// Create an orchestrator for `version` with every step pending.
    pub fn new(version: Version, config: ReleaseConfig, runner: Box<dyn CommandRunner>) -> Self {
        let plan = release_plan(&version, &config);
        let state = OrchestrationState::new(version, &plan);
        ReleaseOrchestrator {
            config,
            plan,
            state,
            runner,
        }
    }

    pub fn plan(&self) -> &[BuildStep] {
        &self.plan
    }

    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    pub fn workspace(&self) -> &Path {
        &self.config.workspace_dir
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// # Returns
    /// * `Ok(artifacts)` - the four artifact paths, in step order
    /// * `Err(BuildError::CommandFailed)` - a toolchain command exited unsuccessfully
    /// * `Err(BuildError::ArtifactMissing | ArtifactMoveFailed)` - relocation failed
    pub async fn run(&mut self) -> Result<Vec<PathBuf>, BuildError> {
        log::info!(
            target: "parsed",
            "Release {} started in {} ({} steps)",
            self.state.version,
            self.config.workspace_dir.display(),
            self.plan.len()
        );

        for index in 0..self.plan.len() {
            if let Err(e) = self.run_step(index).await {
                // main reports the error on the console
                log::info!(
                    target: "parsed",
                    "STEP {}/{} {} FAILED: {}",
                    index + 1,
                    self.plan.len(),
                    self.plan[index].name(),
                    e
                );
                self.state.record_error(index, e.to_string());
                return Err(e);
            }
        }

        let elapsed = self
            .state
            .elapsed_since_start()
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        log::info!(
            target: "parsed",
            "Release {} completed in {:.1}s",
            self.state.version,
            elapsed
        );
        Ok(self.state.artifacts())
    }

    async fn run_step(&mut self, index: usize) -> Result<(), BuildError> {
        let step = &self.plan[index];
        let workspace = self.config.workspace_dir.as_path();

        println!("building {}", step.target_filename);
        log::info!(
            target: "parsed",
            "STEP {}/{} {}: {}",
            index + 1,
            self.plan.len(),
            step.name(),
            step.target_filename
        );

        if let Some(output) = &step.expected_output {
            clear_stale_output(&workspace.join(output))?;
        }

        self.state.transition_to(index, StepPhase::Running)?;
        let status = self.runner.run(step, workspace).await?;
        if !status.success() {
            return Err(BuildError::CommandFailed {
                command: step.command_line(),
                code: status.code,
            });
        }

        let target = step.target_path(workspace);
        if let Some(output) = &step.expected_output {
            self.state.transition_to(index, StepPhase::Relocating)?;
            relocate_artifact(&workspace.join(output), &target)?;
        }

        self.state.record_artifact(index, target)?;
        Ok(())
    }
}
