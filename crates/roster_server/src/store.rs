//! User storage behind the gateway.

use crate::error::{ServerError, ServerResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use roster_protocol::{NewUser, UserId, UserRecord, UserUpdate};
use std::collections::BTreeMap;

/// A generic query client for the user table.
///
/// The gateway only forwards to this trait; hosted databases plug in by
/// implementing it.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns every user, ordered by id.
    async fn list(&self) -> ServerResult<Vec<UserRecord>>;

    /// Returns one user.
    async fn get(&self, id: UserId) -> ServerResult<UserRecord>;

    /// Stores a new user, assigning `id` and `created_at`.
    async fn insert(&self, user: NewUser) -> ServerResult<UserRecord>;

    /// Applies a partial update.
    async fn update(&self, id: UserId, update: UserUpdate) -> ServerResult<UserRecord>;

    /// Removes a user.
    async fn delete(&self, id: UserId) -> ServerResult<()>;
}

/// In-memory user table.
///
/// Ids start at 1 and are never reused. Inserts fail once the id space is
/// exhausted.
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<UserId, UserRecord>>,
    next_id: Mutex<Option<UserId>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_id: Mutex::new(Some(1)),
        }
    }

    /// Creates a store holding `users`; new ids continue after the largest.
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let users: BTreeMap<_, _> = users.into_iter().map(|u| (u.id, u)).collect();
        let next_id = users
            .keys()
            .next_back()
            .map_or(Some(1), |id| id.checked_add(1));
        Self {
            users: RwLock::new(users),
            next_id: Mutex::new(next_id),
        }
    }

    /// Returns the number of stored users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns true if no users are stored.
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> ServerResult<Vec<UserRecord>> {
        Ok(self.users.read().values().cloned().collect())
    }

    async fn get(&self, id: UserId) -> ServerResult<UserRecord> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or(ServerError::NotFound(id))
    }

    async fn insert(&self, user: NewUser) -> ServerResult<UserRecord> {
        let mut next = self.next_id.lock();
        let id = (*next).ok_or_else(|| ServerError::Internal("user id space exhausted".into()))?;
        let record = UserRecord::new(id, user.name, user.email, Utc::now());
        *next = id.checked_add(1);
        self.users.write().insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: UserId, update: UserUpdate) -> ServerResult<UserRecord> {
        let mut users = self.users.write();
        let current = users.get_mut(&id).ok_or(ServerError::NotFound(id))?;
        *current = current.apply(&update);
        Ok(current.clone())
    }

    async fn delete(&self, id: UserId) -> ServerResult<()> {
        self.users
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(ServerError::NotFound(id))
    }
}
