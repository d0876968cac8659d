//! Bearer credentials and the providers that supply them.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An opaque, short-lived bearer token.
///
/// Fetched right before a request and dropped right after it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Source of bearer tokens, usually backed by an identity provider.
///
/// May suspend (silent refresh) and may fail; failures should be reported
/// as [`SyncError::Auth`].
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a token valid for the next request.
    async fn access_token(&self) -> SyncResult<Credential>;
}

#[async_trait]
impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    async fn access_token(&self) -> SyncResult<Credential> {
        (**self).access_token().await
    }
}

/// A provider that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    credential: Option<Credential>,
}

impl StaticCredential {
    /// Creates a provider for a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential::new(token)),
        }
    }

    /// Creates a provider that always fails, as if nobody is signed in.
    pub fn unavailable() -> Self {
        Self { credential: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn access_token(&self) -> SyncResult<Credential> {
        self.credential
            .clone()
            .ok_or_else(|| SyncError::Auth("no user is signed in".into()))
    }
}

/// A provider backed by an async closure.
pub struct FnCredential<F> {
    fetch: F,
}

impl<F, Fut> FnCredential<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = SyncResult<Credential>> + Send,
{
    /// Creates a provider that calls `fetch` for every token.
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<F, Fut> CredentialProvider for FnCredential<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = SyncResult<Credential>> + Send,
{
    async fn access_token(&self) -> SyncResult<Credential> {
        (self.fetch)().await
    }
}
