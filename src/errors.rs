use sems_config::ConfigError;
use sems_core::PortError;
use thiserror::Error;

/// Failures that end the shell rather than a single command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Outbox unavailable: {0}")]
    Outbox(#[from] PortError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Input(err.to_string())
    }
}
