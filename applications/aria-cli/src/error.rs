//! CLI error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Input(String),

    #[error("No playable files found")]
    NothingToPlay,

    #[error("Preferences error: {0}")]
    Preferences(#[from] aria_core::PreferencesError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
