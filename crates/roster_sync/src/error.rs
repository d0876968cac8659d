//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the gateway.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("{message}")]
    Transport {
        /// Error message from the underlying client.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Gateway answered with a non-2xx status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Short description of the failed operation.
        message: String,
    },

    /// The credential provider could not supply a token.
    #[error("credential unavailable: {0}")]
    Auth(String),

    /// Response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a server error for the given status.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status if the gateway answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
