//! Step State Management and Phase Tracking
//!
//! Tracks every planned build step through its lifecycle:
//!
//! ```text
//! Pending -> Running -> Relocating -> Completed
//!               |           |
//!               +-----------+-------> Failed
//! ```
//!
//! Steps whose toolchain writes the artifact itself go straight from
//! `Running` to `Completed`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::BuildError;
use crate::models::{BuildStep, Version};

/// Lifecycle phase of a single build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepPhase {
    /// Planned, not started
    Pending,

    /// External command running
    Running,

    /// Moving compiler output to its versioned filename
    Relocating,

    /// Artifact in place
    Completed,

    /// Command or relocation failed
    Failed,
}

impl StepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepPhase::Pending => "pending",
            StepPhase::Running => "running",
            StepPhase::Relocating => "relocating",
            StepPhase::Completed => "completed",
            StepPhase::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<StepPhase> {
        match self {
            StepPhase::Pending => vec![StepPhase::Running],
            StepPhase::Running => vec![
                StepPhase::Relocating,
                StepPhase::Completed,
                StepPhase::Failed,
            ],
            StepPhase::Relocating => vec![StepPhase::Completed, StepPhase::Failed],
            StepPhase::Completed => vec![],
            StepPhase::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: StepPhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepPhase::Completed | StepPhase::Failed)
    }
}

/// Progress record for one build step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub command: String,
    pub phase: StepPhase,
    /// Artifact location once the step has completed
    pub artifact: Option<PathBuf>,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
    pub error: Option<String>,
}

impl StepRecord {
    fn pending(step: &BuildStep) -> Self {
        StepRecord {
            name: step.name(),
            command: step.command_line(),
            phase: StepPhase::Pending,
            artifact: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }
}

/// Snapshot of a release run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub version: Version,
    pub steps: Vec<StepRecord>,
    pub start_time: SystemTime,
    pub last_update_time: SystemTime,
    /// Error that aborted the run
    pub error: Option<String>,
}

impl OrchestrationState {
    pub fn new(version: Version, plan: &[BuildStep]) -> Self {
        let now = SystemTime::now();
        OrchestrationState {
            version,
            steps: plan.iter().map(StepRecord::pending).collect(),
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Move step `index` to `next`, rejecting illegal transitions.
    pub fn transition_to(&mut self, index: usize, next: StepPhase) -> Result<(), BuildError> {
        let record = self.steps.get_mut(index).ok_or_else(|| {
            BuildError::InvalidTransition(format!("no step at index {}", index))
        })?;

        if !record.phase.can_transition_to(next) {
            return Err(BuildError::InvalidTransition(format!(
                "{}: {} -> {}",
                record.name,
                record.phase.as_str(),
                next.as_str()
            )));
        }

        let now = SystemTime::now();
        if next == StepPhase::Running {
            record.started_at = Some(now);
        }
        if next.is_terminal() {
            record.finished_at = Some(now);
        }
        record.phase = next;
        self.last_update_time = now;
        Ok(())
    }

    /// Mark step `index` completed with its artifact location.
    pub fn record_artifact(&mut self, index: usize, artifact: PathBuf) -> Result<(), BuildError> {
        self.transition_to(index, StepPhase::Completed)?;
        self.steps[index].artifact = Some(artifact);
        Ok(())
    }

    /// Record the error that aborted the run; the step it hit becomes Failed.
    pub fn record_error(&mut self, index: usize, error: String) {
        if let Some(record) = self.steps.get_mut(index) {
            if !record.phase.is_terminal() {
                record.phase = StepPhase::Failed;
                record.finished_at = Some(SystemTime::now());
            }
            record.error = Some(error.clone());
        }
        self.error = Some(error);
        self.last_update_time = SystemTime::now();
    }

    /// Artifacts produced so far, in step order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.steps
            .iter()
            .filter_map(|record| record.artifact.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|record| record.phase == StepPhase::Completed)
    }

    /// Get time elapsed since the run started.
    pub fn elapsed_since_start(&self) -> Result<std::time::Duration, std::time::SystemTimeError> {
        self.start_time.elapsed()
    }
}
