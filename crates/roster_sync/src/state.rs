//! User list synchronization state machine.

use crate::credential::CredentialProvider;
use crate::error::{SyncError, SyncResult};
use crate::transport::UserGateway;
use parking_lot::RwLock;
use roster_protocol::{NewUser, UserRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Error shown when the gateway rejects a read. The response body is never
/// surfaced.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch users";

/// Where the user list is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing fetched yet.
    #[default]
    Idle,
    /// A read is in flight.
    Loading,
    /// The last read succeeded.
    Succeeded,
    /// The last read failed; see [`SyncState::error`].
    Failed,
}

impl SyncStatus {
    /// Returns true while a read is outstanding.
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncStatus::Loading)
    }

    /// Returns true once a read has resolved, either way.
    pub fn is_settled(&self) -> bool {
        matches!(self, SyncStatus::Succeeded | SyncStatus::Failed)
    }
}

/// Client-side record of the user collection.
///
/// `items` only ever holds the result of the last successful read plus
/// records the gateway confirmed since. A `Failed` status always carries a
/// non-empty `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Fetch lifecycle status.
    pub status: SyncStatus,
    /// Known users, in gateway order followed by local appends.
    pub items: Vec<UserRecord>,
    /// Message of the last failed read.
    pub error: Option<String>,
}

/// A transition applied to [`SyncState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A read was issued.
    FetchStarted,
    /// A read returned the full collection.
    FetchSucceeded(Vec<UserRecord>),
    /// A read failed with this message.
    FetchFailed(String),
    /// The gateway confirmed a newly created user.
    UserAdded(UserRecord),
}

impl SyncState {
    /// Creates the initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one transition.
    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::FetchStarted => {
                self.status = SyncStatus::Loading;
            }
            SyncEvent::FetchSucceeded(items) => {
                self.status = SyncStatus::Succeeded;
                self.items = items;
                self.error = None;
            }
            SyncEvent::FetchFailed(message) => {
                self.status = SyncStatus::Failed;
                self.error = Some(if message.is_empty() {
                    FETCH_FAILED_MESSAGE.to_string()
                } else {
                    message
                });
            }
            SyncEvent::UserAdded(user) => {
                self.items.push(user);
            }
        }
    }
}

/// Counters kept by a [`UserSync`] instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Reads actually issued.
    pub fetches_started: u64,
    /// Fetch calls dropped because a read was already in flight.
    pub fetches_skipped: u64,
    /// Reads that ended in `Failed`.
    pub fetch_failures: u64,
    /// Creates confirmed by the gateway.
    pub users_created: u64,
    /// Creates that failed and were only logged.
    pub create_failures: u64,
}

/// What a call to [`UserSync::fetch_users`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The read succeeded with this many users.
    Synced(usize),
    /// The read failed; the message is in the state.
    Failed,
    /// Another read was already in flight; nothing was issued.
    Skipped,
}

/// Clears the in-flight flag when dropped.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps one consumer's view of the user collection in step with the
/// gateway.
///
/// At most one read is in flight per instance. Reads run on the caller's
/// task, except the refetch that follows a create, which runs on its own
/// task so the create can resolve first. No timeout is added on top of the
/// gateway's own.
pub struct UserSync<G: UserGateway, C: CredentialProvider> {
    gateway: G,
    credentials: C,
    state: watch::Sender<SyncState>,
    stats: RwLock<SyncStats>,
    in_flight: Arc<AtomicBool>,
}

impl<G: UserGateway, C: CredentialProvider> UserSync<G, C> {
    /// Creates a state machine in the `Idle` state.
    pub fn new(gateway: G, credentials: C) -> Self {
        let (state, _) = watch::channel(SyncState::new());
        Self {
            gateway,
            credentials,
            state,
            stats: RwLock::new(SyncStats::default()),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true while a read is in flight.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns the gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the credential provider.
    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Reads the full collection and replaces `items` with it.
    ///
    /// A no-op returning [`FetchOutcome::Skipped`] if a read is already in
    /// flight. Failures are recorded in the state, never returned.
    pub async fn fetch_users(&self) -> FetchOutcome {
        match self.begin_fetch() {
            Some(guard) => self.run_fetch(guard).await,
            None => FetchOutcome::Skipped,
        }
    }

    fn begin_fetch(&self) -> Option<InFlight> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.write().fetches_skipped += 1;
            debug!("user fetch already in flight, skipping");
            return None;
        }

        self.stats.write().fetches_started += 1;
        self.dispatch(SyncEvent::FetchStarted);
        Some(InFlight(Arc::clone(&self.in_flight)))
    }

    async fn run_fetch(&self, _guard: InFlight) -> FetchOutcome {
        match self.read_collection().await {
            Ok(users) => {
                let count = users.len();
                self.dispatch(SyncEvent::FetchSucceeded(users));
                info!(count, "user list synchronized");
                FetchOutcome::Synced(count)
            }
            Err(err) => {
                warn!(error = %err, "user fetch failed");
                self.stats.write().fetch_failures += 1;
                self.dispatch(SyncEvent::FetchFailed(failure_message(&err)));
                FetchOutcome::Failed
            }
        }
    }

    async fn read_collection(&self) -> SyncResult<Vec<UserRecord>> {
        let credential = self.credentials.access_token().await?;
        self.gateway.list_users(&credential).await
    }

    async fn submit(&self, user: &NewUser) -> SyncResult<UserRecord> {
        let credential = self.credentials.access_token().await?;
        self.gateway.create_user(&credential, user).await
    }

    fn dispatch(&self, event: SyncEvent) {
        self.state.send_modify(|state| state.apply(event));
    }
}

impl<G, C> UserSync<G, C>
where
    G: UserGateway + 'static,
    C: CredentialProvider + 'static,
{
    /// Creates a user and appends the gateway's record to `items`.
    ///
    /// Returns as soon as the record is appended. A refetch is started on a
    /// separate task unless a read is already in flight, in which case it is
    /// skipped rather than queued; its handle is returned for callers that
    /// want to wait for it. Failures are logged and leave the state
    /// untouched.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn create_user(
        self: &Arc<Self>,
        user: &NewUser,
    ) -> Option<JoinHandle<FetchOutcome>> {
        let created = match self.submit(user).await {
            Ok(created) => created,
            Err(err) => {
                self.stats.write().create_failures += 1;
                error!(error = %err, "failed to add user");
                return None;
            }
        };

        // The refetch decision is taken before the append, so a skipped
        // refetch still leaves the new record visible.
        let refresh = self.begin_fetch();
        debug!(id = created.id, "user created");
        self.stats.write().users_created += 1;
        self.dispatch(SyncEvent::UserAdded(created));

        refresh.map(|guard| {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run_fetch(guard).await })
        })
    }
}

fn failure_message(err: &SyncError) -> String {
    match err {
        SyncError::Server { .. } => FETCH_FAILED_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticCredential;
    use crate::transport::{MockGateway, MockReply};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use tokio::sync::Notify;

    fn user(id: i64, name: &str) -> UserRecord {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        UserRecord::new(id, name, format!("{}@x.com", name.to_lowercase()), created_at)
    }

    fn engine(gateway: &Arc<MockGateway>) -> Arc<UserSync<Arc<MockGateway>, StaticCredential>> {
        Arc::new(UserSync::new(
            Arc::clone(gateway),
            StaticCredential::new("mock-token"),
        ))
    }

    #[test]
    fn status_checks() {
        assert!(SyncStatus::Loading.is_loading());
        assert!(!SyncStatus::Idle.is_settled());
        assert!(SyncStatus::Succeeded.is_settled());
        assert!(SyncStatus::Failed.is_settled());
    }

    #[test]
    fn failed_event_never_leaves_empty_error() {
        let mut state = SyncState::new();
        state.apply(SyncEvent::FetchFailed(String::new()));
        assert_eq!(state.status, SyncStatus::Failed);
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
    }

    #[test]
    fn loading_keeps_previous_items() {
        let mut state = SyncState::new();
        state.apply(SyncEvent::FetchSucceeded(vec![user(1, "John")]));
        state.apply(SyncEvent::FetchStarted);
        assert_eq!(state.status, SyncStatus::Loading);
        assert_eq!(state.items.len(), 1);
    }

    #[tokio::test]
    async fn initial_state() {
        let gateway = Arc::new(MockGateway::new());
        let sync = engine(&gateway);

        assert_eq!(sync.state(), SyncState::new());
        assert_eq!(sync.stats(), SyncStats::default());
        assert!(!sync.is_fetching());
    }

    #[tokio::test]
    async fn fetch_success_replaces_items() {
        let gateway = Arc::new(MockGateway::new());
        let users = vec![user(1, "John Doe")];
        gateway.set_list_reply(MockReply::Ok(users.clone()));
        let sync = engine(&gateway);

        assert_eq!(sync.fetch_users().await, FetchOutcome::Synced(1));

        let state = sync.state();
        assert_eq!(state.status, SyncStatus::Succeeded);
        assert_eq!(state.items, users);
        assert_eq!(state.error, None);
        assert_eq!(gateway.last_token().as_deref(), Some("mock-token"));
    }

    #[tokio::test]
    async fn fetch_server_error_uses_fixed_message() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Status(500));
        let sync = engine(&gateway);

        assert_eq!(sync.fetch_users().await, FetchOutcome::Failed);

        let state = sync.state();
        assert_eq!(state.status, SyncStatus::Failed);
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert_eq!(sync.stats().fetch_failures, 1);
    }

    #[tokio::test]
    async fn fetch_transport_error_keeps_underlying_message() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Transport("connection refused".into()));
        let sync = engine(&gateway);

        sync.fetch_users().await;

        let state = sync.state();
        assert_eq!(state.status, SyncStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn credential_failure_fails_fetch_without_request() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Ok(vec![]));
        let sync = UserSync::new(Arc::clone(&gateway), StaticCredential::unavailable());

        assert_eq!(sync.fetch_users().await, FetchOutcome::Failed);

        let state = sync.state();
        assert_eq!(state.status, SyncStatus::Failed);
        assert!(state.error.unwrap().contains("no user is signed in"));
        assert_eq!(gateway.list_calls(), 0);
        assert!(!sync.is_fetching());
    }

    #[tokio::test]
    async fn concurrent_fetches_issue_one_read() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Ok(vec![user(1, "John")]));
        let gate = Arc::new(Notify::new());
        gateway.hold_reads(Arc::clone(&gate));
        let sync = engine(&gateway);

        let (first, second) = tokio::join!(sync.fetch_users(), async {
            let outcome = sync.fetch_users().await;
            gate.notify_one();
            outcome
        });

        assert_eq!(first, FetchOutcome::Synced(1));
        assert_eq!(second, FetchOutcome::Skipped);
        assert_eq!(gateway.list_calls(), 1);
        assert_eq!(sync.stats().fetches_skipped, 1);
        assert_eq!(sync.state().status, SyncStatus::Succeeded);
    }

    #[tokio::test]
    async fn guard_released_after_failure_and_success() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Status(503));
        let sync = engine(&gateway);

        assert_eq!(sync.fetch_users().await, FetchOutcome::Failed);
        assert!(!sync.is_fetching());

        gateway.set_list_reply(MockReply::Ok(vec![user(1, "John")]));
        assert_eq!(sync.fetch_users().await, FetchOutcome::Synced(1));
        assert_eq!(sync.fetch_users().await, FetchOutcome::Synced(1));

        assert_eq!(gateway.list_calls(), 3);
        assert_eq!(sync.state().error, None);
    }

    #[tokio::test]
    async fn dropped_fetch_releases_guard() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Ok(vec![]));
        gateway.hold_reads(Arc::new(Notify::new()));
        let sync = engine(&gateway);

        {
            let fetch = sync.fetch_users();
            tokio::pin!(fetch);
            tokio::select! {
                biased;
                _ = &mut fetch => panic!("read should be held"),
                _ = tokio::task::yield_now() => {}
            }
            assert!(sync.is_fetching());
        }

        assert!(!sync.is_fetching());
        gateway.release_reads();
        assert_eq!(sync.fetch_users().await, FetchOutcome::Synced(0));
    }

    #[tokio::test]
    async fn create_appends_confirmed_record() {
        let gateway = Arc::new(MockGateway::new());
        let jane = user(2, "Jane");
        gateway.set_create_reply(MockReply::Ok(jane.clone()));
        gateway.set_list_reply(MockReply::Ok(vec![jane.clone()]));
        let sync = engine(&gateway);

        let refresh = sync.create_user(&NewUser::new("Jane", "jane@x.com")).await;
        assert_eq!(refresh.unwrap().await.unwrap(), FetchOutcome::Synced(1));

        let state = sync.state();
        assert_eq!(state.items, vec![jane]);
        assert_eq!(state.status, SyncStatus::Succeeded);
        assert_eq!(gateway.create_calls(), 1);
        assert_eq!(gateway.list_calls(), 1);
        assert_eq!(sync.stats().users_created, 1);
        assert!(!sync.is_fetching());
    }

    #[tokio::test]
    async fn create_resolves_with_record_before_refetch_lands() {
        let gateway = Arc::new(MockGateway::new());
        let jane = user(2, "Jane");
        gateway.set_create_reply(MockReply::Ok(jane.clone()));
        gateway.set_list_reply(MockReply::Ok(vec![]));
        let sync = engine(&gateway);

        let refresh = sync.create_user(&NewUser::new("Jane", "jane@x.com")).await;

        let state = sync.state();
        assert_eq!(state.items, vec![jane]);
        assert_eq!(state.status, SyncStatus::Loading);
        assert!(sync.is_fetching());

        // The refetch result replaces the local append once it completes.
        assert_eq!(refresh.unwrap().await.unwrap(), FetchOutcome::Synced(0));
        assert!(sync.state().items.is_empty());
        assert!(!sync.is_fetching());
    }

    #[tokio::test]
    async fn create_keeps_append_when_refetch_fails() {
        let gateway = Arc::new(MockGateway::new());
        let jane = user(2, "Jane");
        gateway.set_create_reply(MockReply::Ok(jane.clone()));
        gateway.set_list_reply(MockReply::Status(500));
        let sync = engine(&gateway);

        let refresh = sync.create_user(&NewUser::new("Jane", "jane@x.com")).await;
        assert_eq!(refresh.unwrap().await.unwrap(), FetchOutcome::Failed);

        let state = sync.state();
        assert_eq!(state.items, vec![jane]);
        assert_eq!(state.status, SyncStatus::Failed);
    }

    #[tokio::test]
    async fn create_failure_is_not_surfaced() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_create_reply(MockReply::Status(500));
        let sync = engine(&gateway);

        let refresh = sync.create_user(&NewUser::new("Jane", "jane@x.com")).await;
        assert!(refresh.is_none());

        assert_eq!(sync.state(), SyncState::new());
        assert_eq!(gateway.list_calls(), 0);
        assert_eq!(sync.stats().create_failures, 1);
    }

    #[tokio::test]
    async fn create_skips_refetch_while_fetch_in_flight() {
        let gateway = Arc::new(MockGateway::new());
        let jane = user(2, "Jane");
        gateway.set_create_reply(MockReply::Ok(jane.clone()));
        gateway.set_list_reply(MockReply::Ok(vec![user(1, "John")]));
        let gate = Arc::new(Notify::new());
        gateway.hold_reads(Arc::clone(&gate));
        let sync = engine(&gateway);

        let (fetched, after_create) = tokio::join!(sync.fetch_users(), async {
            let refresh = sync.create_user(&NewUser::new("Jane", "jane@x.com")).await;
            assert!(refresh.is_none());
            let snapshot = sync.state();
            gate.notify_one();
            snapshot
        });

        assert!(after_create.items.contains(&jane));
        assert_eq!(after_create.status, SyncStatus::Loading);
        assert_eq!(fetched, FetchOutcome::Synced(1));
        assert_eq!(gateway.list_calls(), 1);
        assert_eq!(sync.stats().fetches_skipped, 1);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_list_reply(MockReply::Ok(vec![user(1, "John")]));
        let sync = engine(&gateway);
        let mut updates = sync.subscribe();

        sync.fetch_users().await;

        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().status, SyncStatus::Succeeded);
    }

    fn record_strategy() -> impl Strategy<Value = UserRecord> {
        (any::<i64>(), "[A-Za-z ]{0,12}").prop_map(|(id, name)| user(id, &name))
    }

    fn event_strategy() -> impl Strategy<Value = SyncEvent> {
        prop_oneof![
            Just(SyncEvent::FetchStarted),
            prop::collection::vec(record_strategy(), 0..4).prop_map(SyncEvent::FetchSucceeded),
            ".{0,16}".prop_map(SyncEvent::FetchFailed),
            record_strategy().prop_map(SyncEvent::UserAdded),
        ]
    }

    proptest! {
        #[test]
        fn failed_state_always_has_error(events in prop::collection::vec(event_strategy(), 0..32)) {
            let mut state = SyncState::new();
            for event in events {
                state.apply(event);
                if state.status == SyncStatus::Failed {
                    prop_assert!(state.error.as_ref().is_some_and(|e| !e.is_empty()));
                }
            }
        }

        #[test]
        fn items_are_last_fetch_plus_appends(events in prop::collection::vec(event_strategy(), 0..32)) {
            let mut state = SyncState::new();
            let mut expected = Vec::new();
            for event in events {
                match &event {
                    SyncEvent::FetchSucceeded(items) => expected = items.clone(),
                    SyncEvent::UserAdded(user) => expected.push(user.clone()),
                    _ => {}
                }
                state.apply(event);
            }
            prop_assert_eq!(state.items, expected);
        }
    }
}
