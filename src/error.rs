//! Error type for the simulation crate
//!
//! Gameplay edge cases never surface here; only configuration failures and
//! programmer errors (malformed catalog data) do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A data table broke one of its structural rules
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("failed to parse configuration: {source}")]
    Config {
        #[from]
        source: serde_json::Error,
    },

    #[error("failed to read configuration: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SimError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        SimError::InvariantViolation(msg.into())
    }
}
