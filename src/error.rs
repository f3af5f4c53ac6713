//! Session errors

use thiserror::Error;

/// Errors surfaced by the wallet session and provider implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Midnight Lace wallet not detected. Please install the extension.")]
    ProviderNotFound,

    #[error("Incompatible wallet version. Expected {expected}, got {found}")]
    IncompatibleVersion { expected: String, found: String },

    #[error("Wallet authorization rejected: {0}")]
    EnableRejected(String),

    #[error("Service URI configuration unavailable: {0}")]
    ServiceUris(String),

    /// Transient; never returned from session operations, only logged.
    #[error("Wallet state fetch failed: {0}")]
    StateFetch(String),

    #[error("A connection attempt is already in progress")]
    AlreadyConnecting,

    #[error("Connection attempt cancelled by disconnect")]
    Cancelled,

    #[error("Provider error: {0}")]
    Provider(String),
}

impl SessionError {
    /// Terminal errors are not worth retrying without user action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionError::ProviderNotFound | SessionError::IncompatibleVersion { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
