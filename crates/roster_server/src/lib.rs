//! # Roster Server
//!
//! Reference REST gateway for Roster users.
//!
//! This crate provides:
//! - HTTP endpoints (`/api/users` collection and `/api/users/{id}` items)
//! - A storage trait with an in-memory implementation
//! - Optional bearer token check on every `/api` route
//!
//! # Architecture
//!
//! Handlers are pass-throughs: they validate the body, forward to the
//! [`UserStore`] and relay the result as JSON. Store failures become `500`
//! with a JSON `{ "error": ... }` body; unknown ids become `404`.
//!
//! # Authentication
//!
//! Tokens are issued elsewhere. When a token is configured the server only
//! checks that each request presents it:
//!
//! ```rust,ignore
//! use roster_server::{RosterServer, ServerConfig};
//!
//! let config = ServerConfig::default().with_api_token("shared-secret");
//! RosterServer::new(config).run().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod store;

pub use auth::{require_bearer, BearerValidator};
pub use config::{ServerConfig, API_TOKEN_VAR, BIND_ADDR_VAR};
pub use error::{ServerError, ServerResult};
pub use handler::HandlerContext;
pub use server::{shutdown_signal, RosterServer};
pub use store::{MemoryUserStore, UserStore};
