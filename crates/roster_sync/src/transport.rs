//! Gateway abstraction for user operations.

use crate::credential::Credential;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use roster_protocol::{NewUser, UserId, UserRecord, UserUpdate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A gateway handles network communication with the user API.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process, mock for testing, etc.). Every call
/// carries the bearer credential it must present.
#[async_trait]
pub trait UserGateway: Send + Sync {
    /// Reads the full user collection.
    async fn list_users(&self, credential: &Credential) -> SyncResult<Vec<UserRecord>>;

    /// Creates a user and returns the stored record.
    async fn create_user(&self, credential: &Credential, user: &NewUser)
        -> SyncResult<UserRecord>;

    /// Reads a single user.
    async fn get_user(&self, credential: &Credential, id: UserId) -> SyncResult<UserRecord>;

    /// Applies a partial update and returns the stored record.
    async fn update_user(
        &self,
        credential: &Credential,
        id: UserId,
        update: &UserUpdate,
    ) -> SyncResult<UserRecord>;

    /// Deletes a user.
    async fn delete_user(&self, credential: &Credential, id: UserId) -> SyncResult<()>;
}

#[async_trait]
impl<G: UserGateway + ?Sized> UserGateway for Arc<G> {
    async fn list_users(&self, credential: &Credential) -> SyncResult<Vec<UserRecord>> {
        (**self).list_users(credential).await
    }

    async fn create_user(
        &self,
        credential: &Credential,
        user: &NewUser,
    ) -> SyncResult<UserRecord> {
        (**self).create_user(credential, user).await
    }

    async fn get_user(&self, credential: &Credential, id: UserId) -> SyncResult<UserRecord> {
        (**self).get_user(credential, id).await
    }

    async fn update_user(
        &self,
        credential: &Credential,
        id: UserId,
        update: &UserUpdate,
    ) -> SyncResult<UserRecord> {
        (**self).update_user(credential, id, update).await
    }

    async fn delete_user(&self, credential: &Credential, id: UserId) -> SyncResult<()> {
        (**self).delete_user(credential, id).await
    }
}

/// A scripted reply for [`MockGateway`].
#[derive(Debug, Clone)]
pub enum MockReply<T> {
    /// 2xx with this body.
    Ok(T),
    /// Non-2xx with this status.
    Status(u16),
    /// The request never reached the gateway.
    Transport(String),
}

impl<T> MockReply<T> {
    fn into_result(self) -> SyncResult<T> {
        match self {
            MockReply::Ok(value) => Ok(value),
            MockReply::Status(status) => Err(SyncError::server(status, "mock status")),
            MockReply::Transport(message) => Err(SyncError::transport_retryable(message)),
        }
    }
}

/// A mock gateway for testing.
///
/// Replies are sticky: once set, every call gets a clone of the same reply.
/// Reads can be held open with [`MockGateway::hold_reads`] to keep a fetch
/// in flight.
#[derive(Debug, Default)]
pub struct MockGateway {
    list_reply: Mutex<Option<MockReply<Vec<UserRecord>>>>,
    create_reply: Mutex<Option<MockReply<UserRecord>>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl MockGateway {
    /// Creates a new mock gateway with no replies set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reply for collection reads.
    pub fn set_list_reply(&self, reply: MockReply<Vec<UserRecord>>) {
        *self.list_reply.lock() = Some(reply);
    }

    /// Sets the reply for creates.
    pub fn set_create_reply(&self, reply: MockReply<UserRecord>) {
        *self.create_reply.lock() = Some(reply);
    }

    /// Makes every read wait until `gate` is notified.
    pub fn hold_reads(&self, gate: Arc<Notify>) {
        *self.read_gate.lock() = Some(gate);
    }

    /// Lets reads answer immediately again.
    pub fn release_reads(&self) {
        *self.read_gate.lock() = None;
    }

    /// Number of collection reads received.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of creates received.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// The token presented on the most recent call.
    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().clone()
    }

    fn record_token(&self, credential: &Credential) {
        *self.last_token.lock() = Some(credential.as_str().to_string());
    }

    fn list_snapshot(&self) -> SyncResult<Vec<UserRecord>> {
        self.list_reply
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Decode("no mock list reply set".into()))?
            .into_result()
    }
}

#[async_trait]
impl UserGateway for MockGateway {
    async fn list_users(&self, credential: &Credential) -> SyncResult<Vec<UserRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.record_token(credential);

        let gate = self.read_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.list_snapshot()
    }

    async fn create_user(
        &self,
        credential: &Credential,
        _user: &NewUser,
    ) -> SyncResult<UserRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.record_token(credential);

        self.create_reply
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Decode("no mock create reply set".into()))?
            .into_result()
    }

    async fn get_user(&self, credential: &Credential, id: UserId) -> SyncResult<UserRecord> {
        self.record_token(credential);
        self.list_snapshot()?
            .into_iter()
            .find(|user| user.id == id)
            .ok_or_else(|| SyncError::server(404, "Not Found"))
    }

    async fn update_user(
        &self,
        credential: &Credential,
        id: UserId,
        update: &UserUpdate,
    ) -> SyncResult<UserRecord> {
        let current = self.get_user(credential, id).await?;
        Ok(current.apply(update))
    }

    async fn delete_user(&self, credential: &Credential, id: UserId) -> SyncResult<()> {
        self.get_user(credential, id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn credential() -> Credential {
        Credential::new("mock-token")
    }

    #[tokio::test]
    async fn mock_list_reply() {
        let gateway = MockGateway::new();
        let users = vec![UserRecord::new(1, "John Doe", "john@x.com", Utc::now())];
        gateway.set_list_reply(MockReply::Ok(users.clone()));

        assert_eq!(gateway.list_users(&credential()).await.unwrap(), users);
        assert_eq!(gateway.list_calls(), 1);
        assert_eq!(gateway.last_token().as_deref(), Some("mock-token"));
    }

    #[tokio::test]
    async fn mock_error_replies() {
        let gateway = MockGateway::new();

        gateway.set_list_reply(MockReply::Status(500));
        let err = gateway.list_users(&credential()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));

        gateway.set_list_reply(MockReply::Transport("connection refused".into()));
        let err = gateway.list_users(&credential()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }));
    }

    #[tokio::test]
    async fn mock_item_operations() {
        let gateway = MockGateway::new();
        gateway.set_list_reply(MockReply::Ok(vec![UserRecord::new(
            1,
            "John Doe",
            "john@x.com",
            Utc::now(),
        )]));

        let updated = gateway
            .update_user(&credential(), 1, &UserUpdate::default().with_name("Jane Doe"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Jane Doe");

        let err = gateway.delete_user(&credential(), 9).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn held_read_waits_for_gate() {
        let gateway = MockGateway::new();
        gateway.set_list_reply(MockReply::Ok(vec![]));
        let gate = Arc::new(Notify::new());
        gateway.hold_reads(Arc::clone(&gate));

        let cred = credential();
        let read = gateway.list_users(&cred);
        tokio::pin!(read);

        tokio::select! {
            biased;
            _ = &mut read => panic!("read should be held"),
            _ = tokio::task::yield_now() => {}
        }

        gate.notify_one();
        assert!(read.await.unwrap().is_empty());
    }
}
