//! Preferences store errors

use thiserror::Error;

/// Result type alias using `PreferencesError`
pub type Result<T> = std::result::Result<T, PreferencesError>;

/// Errors raised by a preferences store
#[derive(Error, Debug)]
pub enum PreferencesError {
    /// Backing file could not be read or written
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Store lock was poisoned by a panicking writer
    #[error("Preferences store poisoned")]
    Poisoned,
}
