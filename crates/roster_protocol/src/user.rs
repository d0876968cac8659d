//! User resource types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned user identifier.
pub type UserId = i64;

/// A user as stored and returned by the gateway.
///
/// Records are created exclusively by the gateway. Clients never edit
/// fields locally; they only hold copies the gateway has confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Creation time, assigned by the gateway.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates a record.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            created_at,
        }
    }

    /// Returns a copy with the fields present in `update` replaced.
    ///
    /// `id` and `created_at` are never touched.
    pub fn apply(&self, update: &UserUpdate) -> Self {
        Self {
            id: self.id,
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            email: update.email.clone().unwrap_or_else(|| self.email.clone()),
            created_at: self.created_at,
        }
    }
}

/// Body of a create request.
///
/// No validation happens on the client; the gateway is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

impl NewUser {
    /// Creates a new create-request body.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Body of a partial update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New email, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserUpdate {
    /// Sets the new name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the new email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns true if the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}
