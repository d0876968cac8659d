//! Configuration for the gateway client.

use roster_protocol::{UserId, USERS_PATH};
use std::time::Duration;

/// Configuration for talking to the gateway.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Gateway origin (e.g., "https://roster.example.com").
    pub base_url: String,
    /// Path of the user collection.
    pub users_path: String,
    /// Request timeout, enforced by the HTTP client.
    pub timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl SyncConfig {
    /// Creates a new configuration for the given gateway origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            users_path: USERS_PATH.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("roster/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Sets the collection path.
    pub fn with_users_path(mut self, path: impl Into<String>) -> Self {
        self.users_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the full URL of the user collection.
    pub fn users_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.users_path.trim_start_matches('/')
        )
    }

    /// Returns the full URL of a single user.
    pub fn user_url(&self, id: UserId) -> String {
        format!("{}/{}", self.users_url().trim_end_matches('/'), id)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:3000")
    }
}
