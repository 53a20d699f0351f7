//! Command orchestration for CLI subcommands.

pub mod replay;

pub use replay::{execute_replay, ReplayResult};

use firewatch_engine::{ConfigError, LedgerError, VerifyError};
use thiserror::Error;

use crate::cli::CliError;
use crate::io::{LoadError, OutputWriterError};

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("input error: {0}")]
    Input(#[from] LoadError),

    #[error("cannot load detection {id}: {source}")]
    Seed {
        id: String,
        #[source]
        source: LedgerError,
    },

    #[error("engine error: {0}")]
    Engine(#[from] VerifyError),

    #[error("output error: {0}")]
    Output(#[from] OutputWriterError),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
