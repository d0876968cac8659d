//! Bearer token check for the `/api` routes.
//!
//! Tokens are opaque: the gateway compares the presented token with the
//! configured shared token and nothing else. Issuing and refreshing tokens
//! belongs to the identity provider.

use crate::error::{ServerError, ServerResult};
use crate::handler::HandlerContext;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Validates `Authorization` header values against a shared token.
#[derive(Clone)]
pub struct BearerValidator {
    token: Vec<u8>,
}

impl BearerValidator {
    /// Creates a validator for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().into_bytes(),
        }
    }

    /// Checks an `Authorization` header value.
    pub fn validate(&self, header: Option<&str>) -> ServerResult<()> {
        let header =
            header.ok_or_else(|| ServerError::Unauthorized("missing bearer token".into()))?;
        let presented = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServerError::Unauthorized("expected a bearer token".into()))?;

        if constant_time_eq(presented.trim().as_bytes(), &self.token) {
            Ok(())
        } else {
            Err(ServerError::Unauthorized("invalid token".into()))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting requests without the configured bearer token.
///
/// Passes everything through when no token is configured.
pub async fn require_bearer(
    State(context): State<Arc<HandlerContext>>,
    request: Request,
    next: Next,
) -> ServerResult<Response> {
    if let Some(validator) = context.validator() {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        validator.validate(header)?;
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_token() {
        let validator = BearerValidator::new("shared-secret");
        assert!(validator.validate(Some("Bearer shared-secret")).is_ok());
    }

    #[test]
    fn rejects_missing_or_malformed() {
        let validator = BearerValidator::new("shared-secret");
        assert!(matches!(
            validator.validate(None),
            Err(ServerError::Unauthorized(_))
        ));
        assert!(validator.validate(Some("Basic shared-secret")).is_err());
        assert!(validator.validate(Some("Bearer wrong-secret")).is_err());
        assert!(validator.validate(Some("Bearer shared")).is_err());
    }
}
