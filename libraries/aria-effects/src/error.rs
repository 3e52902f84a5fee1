//! Effect-specific errors

use thiserror::Error;

/// Result type alias using `EffectError`
pub type Result<T> = std::result::Result<T, EffectError>;

/// Effect error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// The backend does not provide this effect
    #[error("Effect not supported: {0}")]
    Unsupported(&'static str),

    /// Handle belongs to a session that is no longer active
    #[error("Effect handle is bound to stale session {0}")]
    StaleSession(crate::SessionId),

    /// Band index outside the backend's band count
    #[error("Invalid equalizer band {band} (backend has {count})")]
    InvalidBand {
        /// Requested band
        band: u16,
        /// Bands the backend exposes
        count: u16,
    },

    /// Backend failure
    #[error("Effect backend error: {0}")]
    Backend(String),
}
