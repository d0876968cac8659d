//! # Roster Protocol
//!
//! Wire types shared by the Roster client and the gateway.
//!
//! This crate provides:
//! - `UserRecord`, the server-assigned user resource
//! - `NewUser` and `UserUpdate` request bodies
//! - Resource paths for the `/api/users` collection
//!
//! This is a pure protocol crate with no I/O operations. All bodies travel
//! as JSON; timestamps are RFC 3339.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod user;

pub use user::{NewUser, UserId, UserRecord, UserUpdate};

/// Path of the user collection on the gateway.
pub const USERS_PATH: &str = "/api/users";

/// Returns the path of a single user resource.
pub fn user_path(id: UserId) -> String {
    format!("{USERS_PATH}/{id}")
}
