use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;

use dcli_release::cli::Args;
use dcli_release::error::EXIT_FAILURE;
use dcli_release::log_collector::get_default_logs_path;
use dcli_release::orchestrator::OrchestrationState;
use dcli_release::{
    load_config_from_file, release_plan, LogCollector, ProcessRunner, ReleaseConfig,
    ReleaseError, ReleaseOrchestrator, Version,
};

/// Run summary written next to the session logs.
const LAST_RUN_FILE: &str = "last_run.json";

#[tokio::main]
async fn main() -> ExitCode {
    // clap prints usage and exits with status 2 on malformed arguments
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ReleaseError>() {
            Some(release_error) => {
                eprintln!("{}", release_error.user_message());
                ExitCode::from(release_error.exit_code())
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        },
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => load_config_from_file(path).map_err(ReleaseError::from)?,
        None => ReleaseConfig::default(),
    };
    let version = Version::from(args.release_version);

    if args.dry_run {
        print_plan(&version, &config);
        return Ok(());
    }

    let log_dir = match args.log_dir {
        Some(dir) => dir,
        None => get_default_logs_path().map_err(|e| anyhow!(e))?,
    };
    let collector = LogCollector::new(&log_dir)
        .map_err(|e| anyhow!(e))
        .context("LogCollector initialization failed")?;
    if let Err(e) = collector.install(log::LevelFilter::Debug) {
        eprintln!("[Main] WARNING: {}", e);
    }
    log::info!(
        "dcli_release {} logging to {}",
        dcli_release::VERSION,
        collector.session_logs().full.display()
    );

    let mut orchestrator = ReleaseOrchestrator::new(version, config, Box::new(ProcessRunner));
    let outcome = orchestrator.run().await;

    if let Err(e) = write_run_summary(&log_dir, orchestrator.state()) {
        log::warn!("Failed to write run summary: {:#}", e);
    }

    if let (Ok(artifacts), true) = (&outcome, orchestrator.state().is_complete()) {
        println!("Release artifacts:");
        for artifact in artifacts {
            println!("  {}", artifact.display());
        }
    }

    if let Err(e) = collector.wait_for_empty() {
        eprintln!("[Main] WARNING: log flush failed: {}", e);
    }

    outcome.map(|_| ()).map_err(|e| ReleaseError::from(e).into())
}

fn print_plan(version: &Version, config: &ReleaseConfig) {
    for step in release_plan(version, config) {
        println!("[{}] {}", step.name(), step.command_line());
        match &step.expected_output {
            Some(output) => println!(
                "    {} -> {}",
                output.display(),
                step.target_path(&config.workspace_dir).display()
            ),
            None => println!("    -> {}", step.target_path(&config.workspace_dir).display()),
        }
    }
}

fn write_run_summary(log_dir: &Path, state: &OrchestrationState) -> anyhow::Result<PathBuf> {
    let path = log_dir.join(LAST_RUN_FILE);
    let json = serde_json::to_string_pretty(state).context("Failed to serialize run state")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
