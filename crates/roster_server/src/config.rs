//! Server configuration.

use std::env;
use std::net::SocketAddr;
use tracing::warn;

/// Environment variable holding the bind address.
pub const BIND_ADDR_VAR: &str = "ROSTER_BIND_ADDR";
/// Environment variable holding the shared bearer token.
pub const API_TOKEN_VAR: &str = "ROSTER_API_TOKEN";

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Bearer token required on `/api` routes; `None` disables the check.
    pub api_token: Option<String>,
    /// Maximum length of a user name in bytes.
    pub max_name_len: usize,
    /// Maximum length of an email in bytes.
    pub max_email_len: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            api_token: None,
            max_name_len: 256,
            max_email_len: 320,
        }
    }

    /// Loads the configuration from `ROSTER_*` environment variables.
    ///
    /// Unset or invalid values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(BIND_ADDR_VAR) {
            match raw.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => warn!("Invalid {BIND_ADDR_VAR} value {raw:?}: {e}"),
            }
        }

        if let Some(token) = lookup(API_TOKEN_VAR).filter(|t| !t.is_empty()) {
            config.api_token = Some(token);
        }

        config
    }

    /// Requires `Authorization: Bearer <token>` on every `/api` request.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the maximum name length.
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Sets the maximum email length.
    pub fn with_max_email_len(mut self, len: usize) -> Self {
        self.max_email_len = len;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 3000)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap())
            .with_api_token("secret")
            .with_max_name_len(16);

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.max_name_len, 16);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars = HashMap::from([
            (BIND_ADDR_VAR, "0.0.0.0:8081"),
            (API_TOKEN_VAR, "shared-token"),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_addr, "0.0.0.0:8081".parse().unwrap());
        assert_eq!(config.api_token.as_deref(), Some("shared-token"));
    }

    #[test]
    fn invalid_lookup_values_fall_back() {
        let vars = HashMap::from([(BIND_ADDR_VAR, "not-an-addr"), (API_TOKEN_VAR, "")]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
        assert!(config.api_token.is_none());
    }
}
