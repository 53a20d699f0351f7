//! Firewatch CLI.
//!
//! Replays recorded verification traffic through the engine and writes the
//! resulting outcomes, listing and metrics.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod io;

pub use cli::{
    parse_from, Cli, CliError, Command, ReplayArgs, DEFAULT_MIN_CONFIDENCE, DEFAULT_WINDOW_HOURS,
};
pub use commands::{execute_replay, CommandError, CommandResult, ReplayResult};
