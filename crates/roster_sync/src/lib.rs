//! # Roster Sync
//!
//! Client-side synchronization of the Roster user list.
//!
//! This crate provides:
//! - User list state machine (idle → loading → succeeded | failed)
//! - In-flight guard (at most one read per instance)
//! - Create-then-refetch with local append of the confirmed record
//! - Credential provider abstraction (bearer tokens)
//! - Gateway abstraction with an HTTP implementation and a mock
//!
//! ## Architecture
//!
//! A [`UserSync`] owns one [`SyncState`] and two collaborators: a
//! [`CredentialProvider`] asked for a fresh token before every request, and
//! a [`UserGateway`] that performs the request. Presentation code reads
//! snapshots with [`UserSync::state`] or subscribes to changes.
//!
//! ## Key Invariants
//!
//! - At most one read in flight per instance; extra calls are no-ops
//! - The in-flight guard is released on every completion path
//! - `Failed` always carries a non-empty error message
//! - Failed creates are logged and never change the state
//! - `create_user` resolves once the record is appended; its refetch runs
//!   on a spawned task, so the instance must live in an `Arc`
//!
//! ```ignore
//! use roster_sync::{HttpGateway, StaticCredential, SyncConfig, UserSync};
//!
//! let gateway = HttpGateway::new(SyncConfig::new("http://127.0.0.1:3000"))?;
//! let sync = UserSync::new(gateway, StaticCredential::new(token));
//! sync.fetch_users().await;
//! println!("{:?}", sync.state().status);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod credential;
mod error;
mod http;
mod state;
mod transport;

pub use config::SyncConfig;
pub use credential::{Credential, CredentialProvider, FnCredential, StaticCredential};
pub use error::{SyncError, SyncResult};
pub use http::HttpGateway;
pub use state::{
    FetchOutcome, SyncEvent, SyncState, SyncStats, SyncStatus, UserSync, FETCH_FAILED_MESSAGE,
};
pub use transport::{MockGateway, MockReply, UserGateway};

pub use roster_protocol::{NewUser, UserId, UserRecord, UserUpdate};
