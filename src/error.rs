//! Error types shared by the dialer engine

use thiserror::Error;

/// Errors surfaced by queue assembly, dispositions, reconciliation and stats.
#[derive(Debug, Error)]
pub enum DialerError {
    /// Unknown lead id (or phone)
    #[error("lead not found: {0}")]
    NotFound(String),

    /// Unrecognized outcome, zone, status or malformed input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Mutation refused because the lead changed state underneath us
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store connectivity, locking or query failure
    #[error("store unavailable: {0}")]
    UpstreamUnavailable(#[from] rusqlite::Error),

    /// Reconciliation source could not be read or decoded
    #[error("source error: {0}")]
    Source(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DialerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        DialerError::InvalidArgument(msg.into())
    }

    pub fn source(msg: impl std::fmt::Display) -> Self {
        DialerError::Source(msg.to_string())
    }
}

pub type Result<T, E = DialerError> = std::result::Result<T, E>;
