//! Exit codes for the firewatch CLI.

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error, or the engine failed mid-replay.
    pub const IO_ERROR: i32 = 2;
    /// Unreadable or malformed input file.
    pub const INPUT_ERROR: i32 = 3;
    /// Invalid environment configuration.
    pub const CONFIG_ERROR: i32 = 4;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Config(_) => codes::CONFIG_ERROR,
        CommandError::Input(_) | CommandError::Seed { .. } => codes::INPUT_ERROR,
        CommandError::Engine(_) | CommandError::Output(_) => codes::IO_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliError;
    use crate::io::{LoadError, OutputWriterError};
    use firewatch_engine::{ConfigError, LedgerError, VerifyError};
    use firewatch_fs::FsError;

    #[test]
    fn test_exit_code_invalid_argument() {
        let error = CommandError::InvalidArgument(CliError::InvalidWindowHours(0));
        assert_eq!(exit_code(&error), codes::INVALID_ARGS);
    }

    #[test]
    fn test_exit_code_config() {
        let error = CommandError::Config(ConfigError::Invalid {
            name: "HF_RATE_LIMIT_PER_MINUTE",
            value: "lots".to_string(),
        });
        assert_eq!(exit_code(&error), codes::CONFIG_ERROR);
    }

    #[test]
    fn test_exit_code_input() {
        let error = CommandError::Input(LoadError::Read {
            path: "events.jsonl".to_string(),
            source: FsError::Path("events.jsonl".to_string()),
        });
        assert_eq!(exit_code(&error), codes::INPUT_ERROR);

        let error = CommandError::Seed {
            id: "fire-1".to_string(),
            source: LedgerError::DuplicateDetection("fire-1".to_string()),
        };
        assert_eq!(exit_code(&error), codes::INPUT_ERROR);
    }

    #[test]
    fn test_exit_code_engine_and_output() {
        let error = CommandError::Engine(VerifyError::Storage(LedgerError::Unavailable(
            "poisoned".to_string(),
        )));
        assert_eq!(exit_code(&error), codes::IO_ERROR);

        let error = CommandError::Output(OutputWriterError::CreateDir(FsError::Path(
            "/out".to_string(),
        )));
        assert_eq!(exit_code(&error), codes::IO_ERROR);
    }

    #[test]
    fn test_success_is_zero() {
        assert_eq!(codes::SUCCESS, 0);
    }
}
