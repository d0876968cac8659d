//! Error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use roster_protocol::UserId;
use serde_json::json;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the gateway.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request body or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or wrong bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No user with this id.
    #[error("user {0} not found")]
    NotFound(UserId),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_) | ServerError::Unauthorized(_) | ServerError::NotFound(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_)
        )
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
