//! Step execution: toolchain spawning, output streaming, artifact relocation.
//!
//! Integrates with the unified logging pipeline:
//! - every toolchain line is echoed to the console and written to the full log
//! - cargo milestones (`Compiling`, `Finished`, `error:`, produced `.deb`) are
//!   routed to the parsed log

use crate::error::BuildError;
use crate::models::BuildStep;
use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

static CARGO_STATUS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(Compiling|Finished|Packaging|Installing)\s+(.+)$")
        .expect("Invalid cargo status regex")
});
static CARGO_ERROR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^error(\[E\d+\])?:\s*(.+)$").expect("Invalid cargo error regex")
});
static DEB_OUTPUT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+\.deb$").expect("Invalid deb output regex"));

/// Exit status of a finished toolchain command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        CommandStatus { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        CommandStatus {
            code: status.code(),
        }
    }
}

/// Runs the external command behind a build step.
///
/// The command runs with `workspace` as its working directory and must be
/// awaited to completion; the orchestrator never runs two at once.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        step: &'a BuildStep,
        workspace: &'a Path,
    ) -> BoxFuture<'a, Result<CommandStatus, BuildError>>;
}

/// Production runner: spawns the real toolchain.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        step: &'a BuildStep,
        workspace: &'a Path,
    ) -> BoxFuture<'a, Result<CommandStatus, BuildError>> {
        run_step_command(step, workspace).boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Pick out the toolchain lines worth a parsed-log entry.
fn parse_build_milestone(line: &str) -> Option<String> {
    if let Some(caps) = CARGO_STATUS_REGEX.captures(line) {
        return Some(format!("{} {}", &caps[1], caps[2].trim()));
    }

    if let Some(caps) = CARGO_ERROR_REGEX.captures(line) {
        return Some(format!("error: {}", caps[2].trim()));
    }

    let trimmed = line.trim();
    if DEB_OUTPUT_REGEX.is_match(trimmed) {
        return Some(format!("Package written: {}", trimmed));
    }

    None
}

/// Toolchain output is not guaranteed UTF-8 (build scripts, non-UTF-8 paths).
fn decode_line(raw: &[u8]) -> String {
    let line = String::from_utf8_lossy(raw);
    line.trim_end_matches(['\n', '\r']).to_string()
}

fn forward_line(line: &str, stream: OutputStream) {
    match stream {
        OutputStream::Stdout => println!("{}", line),
        OutputStream::Stderr => eprintln!("{}", line),
    }

    log::debug!("{}", line);
    if let Some(milestone) = parse_build_milestone(line) {
        log::info!(target: "parsed", "{}", milestone);
    }
}

/// Spawn the step's command and stream its output until it exits.
///
/// # Returns
/// * `Ok(status)` once the process has exited, successfully or not
/// * `Err(BuildError::SpawnFailed)` if the process could not be started or awaited
pub async fn run_step_command(
    step: &BuildStep,
    workspace: &Path,
) -> Result<CommandStatus, BuildError> {
    let command_line = step.command_line();
    log::info!(
        "[Build] [EXECUTOR] Running '{}' in {}",
        command_line,
        workspace.display()
    );

    let mut command = Command::new(&step.program);
    command
        .args(&step.args)
        .current_dir(workspace)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let spawn_failed = |reason: String| BuildError::SpawnFailed {
        command: command_line.clone(),
        reason,
    };

    let mut child = command.spawn().map_err(|e| spawn_failed(e.to_string()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_failed("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_failed("Failed to capture stderr".to_string()))?;

    let mut stdout = BufReader::new(stdout);
    let mut stderr = BufReader::new(stderr);
    // Partial lines survive a cancelled read_until, so the buffers live
    // outside the loop and are only cleared after a full line.
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout_closed = false;
    let mut stderr_closed = false;

    while !(stdout_closed && stderr_closed) {
        tokio::select! {
            read = stdout.read_until(b'\n', &mut stdout_buf), if !stdout_closed => {
                match read {
                    Ok(0) => {
                        // EOF; flush a final line that had no newline
                        if !stdout_buf.is_empty() {
                            forward_line(&decode_line(&stdout_buf), OutputStream::Stdout);
                            stdout_buf.clear();
                        }
                        stdout_closed = true;
                    }
                    Ok(_) => {
                        forward_line(&decode_line(&stdout_buf), OutputStream::Stdout);
                        stdout_buf.clear();
                    }
                    Err(e) => {
                        log::warn!("stdout read error: {}", e);
                        stdout_closed = true;
                    }
                }
            }
            read = stderr.read_until(b'\n', &mut stderr_buf), if !stderr_closed => {
                match read {
                    Ok(0) => {
                        // EOF; flush a final line that had no newline
                        if !stderr_buf.is_empty() {
                            forward_line(&decode_line(&stderr_buf), OutputStream::Stderr);
                            stderr_buf.clear();
                        }
                        stderr_closed = true;
                    }
                    Ok(_) => {
                        forward_line(&decode_line(&stderr_buf), OutputStream::Stderr);
                        stderr_buf.clear();
                    }
                    Err(e) => {
                        log::warn!("stderr read error: {}", e);
                        stderr_closed = true;
                    }
                }
            }
        }
    }

    // Close our ends so a child still writing gets EPIPE instead of blocking.
    drop(stdout);
    drop(stderr);

    let status = child
        .wait()
        .await
        .map_err(|e| spawn_failed(format!("Failed to wait for process: {}", e)))?;

    log::info!("[Build] [EXECUTOR] '{}' exited with {}", command_line, status);
    Ok(CommandStatus::from(status))
}

/// Delete a leftover compiler output so only a fresh build can satisfy the move.
pub fn clear_stale_output(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        log::warn!(
            "[Build] [STALE] Removing leftover build output before compiling: {}",
            path.display()
        );
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Move `from` to `to`, falling back to copy + remove across filesystems.
pub fn relocate_artifact(from: &Path, to: &Path) -> Result<(), BuildError> {
    if !from.is_file() {
        return Err(BuildError::ArtifactMissing(from.display().to_string()));
    }

    let move_failed = |reason: String| BuildError::ArtifactMoveFailed {
        from: from.display().to_string(),
        to: to.display().to_string(),
        reason,
    };

    if let Err(rename_err) = fs::rename(from, to) {
        log::debug!(
            "rename {} -> {} failed ({}), copying instead",
            from.display(),
            to.display(),
            rename_err
        );
        fs::copy(from, to).map_err(|e| move_failed(e.to_string()))?;
        fs::remove_file(from).map_err(|e| move_failed(e.to_string()))?;
    }

    log::info!(
        "[Build] [ARTIFACT] Moved {} -> {}",
        from.display(),
        to.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactKind, Variant};
    use tempfile::TempDir;

    #[test]
    fn test_parse_build_milestone_cargo_status() {
        assert_eq!(
            parse_build_milestone("   Compiling dcli v0.4.0 (/src/dcli)"),
            Some("Compiling dcli v0.4.0 (/src/dcli)".to_string())
        );
        assert_eq!(
            parse_build_milestone("    Finished `release` profile [optimized] target(s) in 41.2s"),
            Some("Finished `release` profile [optimized] target(s) in 41.2s".to_string())
        );
    }

    #[test]
    fn test_parse_build_milestone_errors() {
        assert_eq!(
            parse_build_milestone("error[E0425]: cannot find value `x` in this scope"),
            Some("error: cannot find value `x` in this scope".to_string())
        );
        assert_eq!(
            parse_build_milestone("error: could not compile `dcli`"),
            Some("error: could not compile `dcli`".to_string())
        );
    }

    #[test]
    fn test_parse_build_milestone_deb_output() {
        assert_eq!(
            parse_build_milestone("/src/dcli/dcli_1.2.3_amd64.deb"),
            Some("Package written: /src/dcli/dcli_1.2.3_amd64.deb".to_string())
        );
    }

    #[test]
    fn test_parse_build_milestone_no_match() {
        assert_eq!(parse_build_milestone("warning: unused variable"), None);
        assert_eq!(parse_build_milestone("random output"), None);
    }

    #[test]
    fn test_command_status() {
        assert!(CommandStatus::from_code(0).success());
        assert!(!CommandStatus::from_code(101).success());
        assert!(!CommandStatus { code: None }.success());
    }

    #[test]
    fn test_relocate_artifact_moves_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("dcli");
        let to = temp_dir.path().join("dcli_1.0-x86_64-unknown-linux-gnu");
        fs::write(&from, b"ELF").unwrap();

        relocate_artifact(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"ELF");
    }

    #[test]
    fn test_relocate_artifact_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = relocate_artifact(
            &temp_dir.path().join("target/release/dcli"),
            &temp_dir.path().join("out"),
        );
        assert!(matches!(result, Err(BuildError::ArtifactMissing(_))));
    }

    #[test]
    fn test_relocate_artifact_unwritable_destination() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("dcli");
        fs::write(&from, b"ELF").unwrap();
        let to = temp_dir.path().join("no/such/dir/out");

        let result = relocate_artifact(&from, &to);
        assert!(matches!(result, Err(BuildError::ArtifactMoveFailed { .. })));
        assert!(from.exists());
    }

    #[test]
    fn test_clear_stale_output() {
        let temp_dir = TempDir::new().unwrap();
        let stale = temp_dir.path().join("dcli");
        fs::write(&stale, b"old").unwrap();

        clear_stale_output(&stale).unwrap();
        assert!(!stale.exists());

        // Absent output is fine
        clear_stale_output(&stale).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_step_command_reports_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let step = BuildStep {
            variant: Variant::Default,
            kind: ArtifactKind::Binary,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo Compiling dcli; exit 3".to_string()],
            expected_output: None,
            target_filename: "unused".to_string(),
        };

        let status = ProcessRunner.run(&step, temp_dir.path()).await.unwrap();
        assert_eq!(status, CommandStatus::from_code(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_step_command_runs_in_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let step = BuildStep {
            variant: Variant::Default,
            kind: ArtifactKind::DebPackage,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo built > marker".to_string()],
            expected_output: None,
            target_filename: "marker".to_string(),
        };

        let status = ProcessRunner.run(&step, temp_dir.path()).await.unwrap();
        assert!(status.success());
        assert!(temp_dir.path().join("marker").exists());
    }

    #[test]
    fn test_decode_line_is_lossy() {
        assert_eq!(decode_line(b"bad \xff byte\r\n"), "bad \u{FFFD} byte");
        assert_eq!(decode_line(b"no newline"), "no newline");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_step_command_survives_invalid_utf8_and_large_output() {
        let temp_dir = TempDir::new().unwrap();
        let script = "printf 'bad \\377 byte\\n' >&2; \
                      printf 'bad \\377 byte\\n'; \
                      head -c 300000 /dev/zero | tr '\\0' a; \
                      head -c 300000 /dev/zero | tr '\\0' b >&2; \
                      exit 4";
        let step = BuildStep {
            variant: Variant::Default,
            kind: ArtifactKind::Binary,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            expected_output: None,
            target_filename: "unused".to_string(),
        };

        let status = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ProcessRunner.run(&step, temp_dir.path()),
        )
        .await
        .expect("runner must drain output to completion")
        .unwrap();
        assert_eq!(status, CommandStatus::from_code(4));
    }

    #[tokio::test]
    async fn test_run_step_command_spawn_failure() {
        let temp_dir = TempDir::new().unwrap();
        let step = BuildStep {
            variant: Variant::Default,
            kind: ArtifactKind::Binary,
            program: "definitely-not-a-real-cargo-binary".to_string(),
            args: vec!["build".to_string()],
            expected_output: None,
            target_filename: "unused".to_string(),
        };

        let result = ProcessRunner.run(&step, temp_dir.path()).await;
        assert!(matches!(result, Err(BuildError::SpawnFailed { .. })));
    }
}
