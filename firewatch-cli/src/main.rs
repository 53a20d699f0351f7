//! Firewatch CLI binary.
//!
//! Entry point for the `firewatch` command-line tool.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use firewatch_cli::exit::{codes, exit_code};
use firewatch_cli::{execute_replay, Cli, Command, CommandError, ReplayArgs};
use firewatch_clock::SystemClock;
use firewatch_engine::{EngineConfig, StderrLogger, Verbosity};
use firewatch_fs::RealFilesystem;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Replay(args) => run_replay(args),
    };

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Run the replay command.
fn run_replay(args: ReplayArgs) -> Result<(), CommandError> {
    let config = EngineConfig::from_env()?;
    let logger = Arc::new(StderrLogger::new(Verbosity::from_count(args.verbose)));

    let clock = SystemClock;
    let fs = RealFilesystem;

    let result = execute_replay(&args, config, &fs, &clock, logger)?;

    println!("Replay complete:");
    println!("  Detections loaded: {}", result.detections_loaded);
    println!(
        "  Events replayed: {} ({} accepted, {} rejected, {} blocked)",
        result.events_replayed, result.accepted, result.rejected, result.blocked
    );
    println!("  Listed detections: {}", result.listed);
    println!("  Evaluated at: {}", result.as_of.to_rfc3339());
    println!();
    println!("Output files:");
    println!("  Outcomes: {}", result.outcomes_path.display());
    println!("  Listing: {}", result.listing_path.display());
    println!("  Metrics: {}", result.metrics_path.display());

    Ok(())
}
