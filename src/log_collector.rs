//! Decoupled logging pipeline for release builds.
//!
//! # Architecture
//!
//! ```text
//! log::info!/warn!/debug!  (toolchain output, step milestones)
//!     |
//! [LogCollector] (log::Log impl, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [DiskPersister thread]
//!     |                         |
//! logs/full/<ts>_full.log   logs/parsed/<ts>_parsed.log
//! (every line)              (target "parsed" only)
//! ```
//!
//! Warnings and errors are also echoed to stderr so they stay visible on the
//! console. Call `wait_for_empty()` before exiting so the tail of the run
//! reaches disk.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log target for high-level milestones that also go to the parsed log.
pub const PARSED_TARGET: &str = "parsed";

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// Get the default logs path relative to the current working directory: ./logs
pub fn get_default_logs_path() -> Result<PathBuf, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to get current working directory: {}", e))?;
    Ok(cwd.join("logs"))
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    /// Whether the line also belongs in the parsed log
    pub parsed: bool,
    /// Timestamp of when the log was created
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: String) -> Self {
        LogLine {
            message,
            parsed: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(message: String) -> Self {
        LogLine {
            parsed: true,
            ..LogLine::new(message)
        }
    }

    fn formatted(&self) -> String {
        format!("[{}] {}\n", self.timestamp, self.message)
    }
}

/// Session log files written by one run.
#[derive(Clone, Debug)]
pub struct SessionLogs {
    pub full: PathBuf,
    pub parsed: PathBuf,
}

/// Logger persisting every record to the session log files.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    session: SessionLogs,
}

impl LogCollector {
    /// Create the log directories and start the disk persister thread.
    pub fn new(log_dir: &Path) -> Result<Self, String> {
        let full_log_dir = log_dir.join("full");
        let parsed_log_dir = log_dir.join("parsed");
        std::fs::create_dir_all(&full_log_dir)
            .map_err(|e| format!("Failed to create full log dir: {}", e))?;
        std::fs::create_dir_all(&parsed_log_dir)
            .map_err(|e| format!("Failed to create parsed log dir: {}", e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let session = SessionLogs {
            full: full_log_dir.join(format!("{}_full.log", stamp)),
            parsed: parsed_log_dir.join(format!("{}_parsed.log", stamp)),
        };

        let full_file = open_append(&session.full)?;
        let parsed_file = open_append(&session.parsed)?;

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread rather than a tokio task: records arrive from any thread
        // and the blocking recv() must not stall the runtime.
        std::thread::spawn(move || {
            let mut full_file = full_file;
            let mut parsed_file = parsed_file;

            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let formatted = line.formatted();
                        let _ = full_file.write_all(formatted.as_bytes());
                        if line.parsed {
                            let _ = parsed_file.write_all(formatted.as_bytes());
                        }
                    }
                    LogMessage::Flush(done) => {
                        let _ = full_file.flush();
                        let _ = parsed_file.flush();
                        let _ = full_file.sync_data();
                        let _ = parsed_file.sync_data();
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector { tx, session })
    }

    /// Register as the global `log` backend.
    pub fn install(&self, max_level: LevelFilter) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(max_level))
            .map_err(|e| format!("Failed to set LogCollector as global logger: {}", e))
    }

    pub fn session_logs(&self) -> &SessionLogs {
        &self.session
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(message.into()));
    }

    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log_line(LogLine::parsed(message.into()));
    }

    /// Block until every line sent before this call is on disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;

        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

/// Wires all log::info!(), log::warn!(), log::error!() calls into LogCollector
impl Log for LogCollector {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = format!("[{}] {}", record.level(), record.args());

        if record.level() <= Level::Warn {
            eprintln!("{}", message);
        }

        // Target-aware routing: "parsed" records are high-level milestones
        if record.target() == PARSED_TARGET {
            self.log_parsed(message);
        } else {
            self.log_str(message);
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
