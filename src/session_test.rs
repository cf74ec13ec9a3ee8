use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use tokio::sync::Notify;

use super::*;
use crate::storage::{MemoryStore, StorageError};

// =============================================================================
// FAKES
// =============================================================================

struct Reply {
    gate: Option<Arc<Notify>>,
    result: Result<Identity, ApiError>,
}

/// Scripted profile endpoint. Replies are consumed in order; once the
/// script runs out every call answers 401.
#[derive(Default)]
struct FakeProfileApi {
    replies: Mutex<VecDeque<Reply>>,
    tokens: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeProfileApi {
    fn replying(results: Vec<Result<Identity, ApiError>>) -> Arc<Self> {
        let api = Self::default();
        api.replies
            .lock()
            .unwrap()
            .extend(results.into_iter().map(|result| Reply { gate: None, result }));
        Arc::new(api)
    }

    fn push_gated(&self, gate: Arc<Notify>, result: Result<Identity, ApiError>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply { gate: Some(gate), result });
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ProfileApi for FakeProfileApi {
    async fn fetch_profile(&self, token: &str) -> Result<Identity, ApiError> {
        self.tokens.lock().unwrap().push(token.to_owned());
        let reply = self.replies.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(reply) = reply else {
            return Err(ApiError::Status { status: 401, body: String::new() });
        };
        if let Some(gate) = reply.gate {
            gate.notified().await;
        }
        reply.result
    }
}

/// Storage whose every operation fails.
struct BrokenStore;

#[async_trait::async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(std::io::Error::other("disk unavailable").into())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(std::io::Error::other("disk unavailable").into())
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(std::io::Error::other("disk unavailable").into())
    }
}

/// Memory storage whose `set` waits on `gate` once `hold_sets` is raised.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    gate: Arc<Notify>,
    hold_sets: AtomicBool,
    sets_entered: AtomicUsize,
}

#[async_trait::async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.sets_entered.fetch_add(1, Ordering::SeqCst);
        if self.hold_sets.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

fn identity(id: &str, role: Role) -> Identity {
    Identity {
        id: id.into(),
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        email: format!("{id}@example.test"),
        role,
        profile_image: None,
        cover_image: None,
        shipping_address: None,
    }
}

fn store_with(storage: &Arc<MemoryStore>, api: &Arc<FakeProfileApi>) -> SessionStore {
    SessionStore::new(storage.clone(), api.clone())
}

async fn wait_for_calls(api: &FakeProfileApi, n: usize) {
    while api.calls() < n {
        tokio::task::yield_now().await;
    }
}

fn assert_signed_out(session: &Session) {
    assert_eq!(session.token, None);
    assert_eq!(session.profile, None);
    assert_eq!(session.role(), None);
    assert!(session.user().is_none());
    assert!(session.photographer().is_none());
    assert!(session.hydrated);
}

// =============================================================================
// Initial state and restoration
// =============================================================================

#[tokio::test]
async fn new_store_is_empty_and_unhydrated() {
    let store = store_with(&Arc::new(MemoryStore::new()), &FakeProfileApi::replying(vec![]));
    let session = store.snapshot();
    assert_eq!(session, Session::default());
    assert!(!session.hydrated);
}

#[tokio::test]
async fn start_with_empty_storage_resolves_anonymous() {
    let api = FakeProfileApi::replying(vec![]);
    let (store, restore) = SessionStore::start(Arc::new(MemoryStore::new()), api.clone());
    restore.await.unwrap();

    assert_signed_out(&store.snapshot());
    assert_eq!(api.calls(), 0, "no token means no network call");
}

#[tokio::test]
async fn start_restores_persisted_token() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "persisted").await.unwrap();
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);

    let (store, _restore) = SessionStore::start(storage, api.clone());
    let session = store.wait_hydrated().await;

    assert_eq!(session.token.as_deref(), Some("persisted"));
    assert_eq!(session.photographer().map(|p| p.id.as_str()), Some("p1"));
    assert_eq!(api.tokens(), vec!["persisted".to_owned()]);
}

#[tokio::test]
async fn stored_token_rejected_clears_everything() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "expired").await.unwrap();
    storage.set(PROFILE_SNAPSHOT_KEY, "{}").await.unwrap();
    let api = FakeProfileApi::replying(vec![Err(ApiError::Status { status: 401, body: String::new() })]);

    let (store, restore) = SessionStore::start(storage.clone(), api);
    restore.await.unwrap();

    assert_signed_out(&store.snapshot());
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap(), None);
    assert_eq!(storage.get(PROFILE_SNAPSHOT_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn empty_persisted_token_is_anonymous() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "").await.unwrap();
    let api = FakeProfileApi::replying(vec![]);
    let store = store_with(&storage, &api);

    store.fetch_user_profile().await;

    assert_signed_out(&store.snapshot());
    assert_eq!(api.calls(), 0);
}

// =============================================================================
// signin
// =============================================================================

#[tokio::test]
async fn signin_photographer_fills_photographer_slot() {
    let storage = Arc::new(MemoryStore::new());
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);
    let store = store_with(&storage, &api);

    store.signin("abc123").await;

    let session = store.snapshot();
    assert_eq!(session.token.as_deref(), Some("abc123"));
    assert_eq!(session.role(), Some(Role::Photographer));
    assert_eq!(session.photographer().map(|p| p.id.as_str()), Some("p1"));
    assert!(session.user().is_none());
    assert!(session.hydrated);
    assert!(session.is_authenticated());
    assert_eq!(api.tokens(), vec!["abc123".to_owned()]);
}

#[tokio::test]
async fn signin_user_fills_user_slot() {
    let api = FakeProfileApi::replying(vec![Ok(identity("u1", Role::User))]);
    let store = store_with(&Arc::new(MemoryStore::new()), &api);

    store.signin("tok").await;

    let session = store.snapshot();
    assert_eq!(session.role(), Some(Role::User));
    assert_eq!(session.user().map(|u| u.id.as_str()), Some("u1"));
    assert!(session.photographer().is_none());
}

#[tokio::test]
async fn signin_persists_token() {
    let storage = Arc::new(MemoryStore::new());
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);
    let store = store_with(&storage, &api);

    store.signin("abc123").await;

    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn signin_with_rejected_token_ends_signed_out() {
    let storage = Arc::new(MemoryStore::new());
    let api = FakeProfileApi::replying(vec![Err(ApiError::Status { status: 403, body: String::new() })]);
    let store = store_with(&storage, &api);

    store.signin("bad").await;

    assert_signed_out(&store.snapshot());
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn signin_empty_token_is_ignored() {
    let storage = Arc::new(MemoryStore::new());
    let api = FakeProfileApi::replying(vec![]);
    let store = store_with(&storage, &api);

    store.signin("").await;

    assert_signed_out(&store.snapshot());
    assert_eq!(api.calls(), 0);
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn signin_storage_failure_signs_out_without_fetch() {
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);
    let store = SessionStore::new(Arc::new(BrokenStore), api.clone());

    store.signin("abc123").await;

    assert_signed_out(&store.snapshot());
    assert_eq!(api.calls(), 0);
}

// =============================================================================
// fetch_user_profile
// =============================================================================

#[tokio::test]
async fn transport_failure_signs_out() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "tok").await.unwrap();
    let api = FakeProfileApi::replying(vec![Err(ApiError::Transport("connection refused".into()))]);
    let store = store_with(&storage, &api);

    store.fetch_user_profile().await;

    assert_signed_out(&store.snapshot());
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_identity_signs_out() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "tok").await.unwrap();
    let api = FakeProfileApi::replying(vec![Err(ApiError::Decode("missing field `type`".into()))]);
    let store = store_with(&storage, &api);

    store.fetch_user_profile().await;

    assert_signed_out(&store.snapshot());
}

#[tokio::test]
async fn refetch_overwrites_profile() {
    let mut renamed = identity("p1", Role::Photographer);
    renamed.first_name = "Renamed".into();
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer)), Ok(renamed)]);
    let store = store_with(&Arc::new(MemoryStore::new()), &api);

    store.signin("tok").await;
    store.fetch_user_profile().await;

    let session = store.snapshot();
    assert_eq!(session.photographer().map(|p| p.first_name.as_str()), Some("Renamed"));
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn role_change_moves_profile_between_slots() {
    let api = FakeProfileApi::replying(vec![Ok(identity("a1", Role::User)), Ok(identity("a1", Role::Photographer))]);
    let store = store_with(&Arc::new(MemoryStore::new()), &api);

    store.signin("tok").await;
    assert!(store.snapshot().user().is_some());

    store.fetch_user_profile().await;
    let session = store.snapshot();
    assert!(session.user().is_none());
    assert!(session.photographer().is_some());
}

#[tokio::test]
async fn memory_token_preferred_over_storage() {
    let storage = Arc::new(MemoryStore::new());
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer)), Ok(identity("p1", Role::Photographer))]);
    let store = store_with(&storage, &api);

    store.signin("in-memory").await;
    storage.set(AUTH_TOKEN_KEY, "on-disk").await.unwrap();
    store.fetch_user_profile().await;

    assert_eq!(api.tokens(), vec!["in-memory".to_owned(), "in-memory".to_owned()]);
}

#[tokio::test]
async fn unreadable_storage_is_anonymous() {
    let api = FakeProfileApi::replying(vec![]);
    let store = SessionStore::new(Arc::new(BrokenStore), api.clone());

    store.fetch_user_profile().await;

    assert_signed_out(&store.snapshot());
    assert_eq!(api.calls(), 0);
}

// =============================================================================
// signout
// =============================================================================

#[tokio::test]
async fn signout_when_empty_only_hydrates() {
    let store = store_with(&Arc::new(MemoryStore::new()), &FakeProfileApi::replying(vec![]));

    store.signout().await;

    assert_eq!(store.snapshot(), Session { token: None, profile: None, hydrated: true });
}

#[tokio::test]
async fn signout_clears_memory_and_storage() {
    let storage = Arc::new(MemoryStore::new());
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);
    let store = store_with(&storage, &api);
    store.signin("abc123").await;
    storage.set(PROFILE_SNAPSHOT_KEY, "{}").await.unwrap();

    store.signout().await;

    assert_signed_out(&store.snapshot());
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn signout_is_idempotent() {
    let store = store_with(&Arc::new(MemoryStore::new()), &FakeProfileApi::replying(vec![]));
    store.signout().await;
    store.signout().await;
    assert_signed_out(&store.snapshot());
}

#[tokio::test]
async fn signout_survives_storage_failure() {
    let store = SessionStore::new(Arc::new(BrokenStore), FakeProfileApi::replying(vec![]));
    store.signout().await;
    assert_signed_out(&store.snapshot());
}

// =============================================================================
// Hydration
// =============================================================================

#[tokio::test]
async fn hydrated_never_resets() {
    let api = FakeProfileApi::replying(vec![
        Ok(identity("p1", Role::Photographer)),
        Err(ApiError::Transport("offline".into())),
    ]);
    let store = store_with(&Arc::new(MemoryStore::new()), &api);

    store.fetch_user_profile().await;
    assert!(store.snapshot().hydrated);
    store.signin("tok").await;
    assert!(store.snapshot().hydrated);
    store.fetch_user_profile().await;
    assert!(store.snapshot().hydrated);
    store.signout().await;
    assert!(store.snapshot().hydrated);
}

#[tokio::test]
async fn wait_hydrated_returns_immediately_when_hydrated() {
    let store = store_with(&Arc::new(MemoryStore::new()), &FakeProfileApi::replying(vec![]));
    store.signout().await;
    assert!(store.wait_hydrated().await.hydrated);
}

#[tokio::test]
async fn subscribers_observe_signout() {
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);
    let store = store_with(&Arc::new(MemoryStore::new()), &api);
    store.signin("tok").await;

    let mut rx = store.subscribe();
    rx.mark_unchanged();
    store.signout().await;

    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().profile.is_none());
}

// =============================================================================
// Superseded fetches
// =============================================================================

#[tokio::test]
async fn fetch_superseded_by_signout_is_discarded() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "tok").await.unwrap();
    let api = Arc::new(FakeProfileApi::default());
    let gate = Arc::new(Notify::new());
    api.push_gated(gate.clone(), Ok(identity("p1", Role::Photographer)));
    let store = Arc::new(store_with(&storage, &api));

    let pending = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch_user_profile().await })
    };
    wait_for_calls(&api, 1).await;

    store.signout().await;
    gate.notify_one();
    pending.await.unwrap();

    assert_signed_out(&store.snapshot());
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn failed_fetch_superseded_by_signin_does_not_sign_out() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "stale").await.unwrap();
    let api = Arc::new(FakeProfileApi::default());
    let gate = Arc::new(Notify::new());
    api.push_gated(gate.clone(), Err(ApiError::Status { status: 401, body: String::new() }));
    api.replies
        .lock()
        .unwrap()
        .push_back(Reply { gate: None, result: Ok(identity("p2", Role::Photographer)) });
    let store = Arc::new(store_with(&storage, &api));

    let restore = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch_user_profile().await })
    };
    wait_for_calls(&api, 1).await;

    store.signin("fresh").await;
    gate.notify_one();
    restore.await.unwrap();

    let session = store.snapshot();
    assert_eq!(session.token.as_deref(), Some("fresh"));
    assert_eq!(session.photographer().map(|p| p.id.as_str()), Some("p2"));
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn later_fetch_wins_over_slower_earlier_fetch() {
    let api = Arc::new(FakeProfileApi::default());
    let gate = Arc::new(Notify::new());
    api.push_gated(gate.clone(), Ok(identity("old", Role::Photographer)));
    api.replies
        .lock()
        .unwrap()
        .push_back(Reply { gate: None, result: Ok(identity("new", Role::Photographer)) });
    let storage = Arc::new(MemoryStore::new());
    storage.set(AUTH_TOKEN_KEY, "tok").await.unwrap();
    let store = Arc::new(store_with(&storage, &api));

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch_user_profile().await })
    };
    wait_for_calls(&api, 1).await;

    store.fetch_user_profile().await;
    gate.notify_one();
    slow.await.unwrap();

    assert_eq!(store.snapshot().photographer().map(|p| p.id.as_str()), Some("new"));
}

#[tokio::test]
async fn signin_superseded_by_signout_during_token_write_stays_signed_out() {
    let storage = Arc::new(GatedStore::default());
    storage.hold_sets.store(true, Ordering::SeqCst);
    let api = FakeProfileApi::replying(vec![Ok(identity("p1", Role::Photographer))]);
    let store = Arc::new(SessionStore::new(storage.clone(), api.clone()));

    let pending = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.signin("tok").await })
    };
    while storage.sets_entered.load(Ordering::SeqCst) < 1 {
        tokio::task::yield_now().await;
    }

    store.signout().await;
    storage.gate.notify_one();
    pending.await.unwrap();

    assert_signed_out(&store.snapshot());
    assert_eq!(api.calls(), 0, "superseded signin must not fetch");
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn signin_superseded_by_later_signin_keeps_the_later_token() {
    let storage = Arc::new(GatedStore::default());
    storage.hold_sets.store(true, Ordering::SeqCst);
    let api = FakeProfileApi::replying(vec![Ok(identity("p2", Role::Photographer))]);
    let store = Arc::new(SessionStore::new(storage.clone(), api.clone()));

    let first = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.signin("first").await })
    };
    while storage.sets_entered.load(Ordering::SeqCst) < 1 {
        tokio::task::yield_now().await;
    }

    storage.hold_sets.store(false, Ordering::SeqCst);
    store.signin("second").await;
    storage.gate.notify_one();
    first.await.unwrap();

    let session = store.snapshot();
    assert_eq!(session.token.as_deref(), Some("second"));
    assert_eq!(session.photographer().map(|p| p.id.as_str()), Some("p2"));
    assert_eq!(api.tokens(), vec!["second".to_owned()]);
    assert_eq!(storage.get(AUTH_TOKEN_KEY).await.unwrap().as_deref(), Some("second"));
}
