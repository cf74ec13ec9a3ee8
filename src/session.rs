//! Session store — auth token, current profile, and hydration state.
//!
//! DESIGN
//! ======
//! One `SessionStore` is built at startup and shared by `Arc`. State lives in
//! a `watch` channel so readers can take cheap snapshots or wait for changes
//! (e.g. "until hydrated") without polling.
//!
//! Operations never return errors. Every failure (missing token aside) ends
//! in the signed-out state with `hydrated = true`: a session whose validity
//! is in doubt is treated as gone.
//!
//! CONCURRENCY
//! ===========
//! Each `signin`, `fetch_user_profile`, and `signout` bumps `generation`.
//! A profile fetch remembers the generation it started with and only writes
//! its result if nothing newer has started since. This keeps a slow restore
//! from repopulating state after an explicit sign-out, and keeps two
//! overlapping fetches from racing on the final write. A `signin` superseded
//! while its token write is pending never adopts that token and takes the
//! write back. In-flight HTTP requests are not cancelled; their results are
//! just dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::net::{ApiError, Identity, ProfileApi, Role};
use crate::storage::{AUTH_TOKEN_KEY, KeyValueStore, PROFILE_SNAPSHOT_KEY};

// =============================================================================
// SESSION
// =============================================================================

/// The loaded identity, held in the slot matching its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    User(Identity),
    Photographer(Identity),
}

impl Profile {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::User(_) => Role::User,
            Self::Photographer(_) => Role::Photographer,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        match self {
            Self::User(identity) | Self::Photographer(identity) => identity,
        }
    }
}

impl From<Identity> for Profile {
    fn from(identity: Identity) -> Self {
        match identity.role {
            Role::User => Self::User(identity),
            Role::Photographer => Self::Photographer(identity),
        }
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub profile: Option<Profile>,
    /// False until the first resolution attempt finishes; never reset.
    pub hydrated: bool,
}

impl Session {
    /// Role of the loaded profile, if any.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(Profile::role)
    }

    /// The end-user slot.
    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        match &self.profile {
            Some(Profile::User(identity)) => Some(identity),
            _ => None,
        }
    }

    /// The photographer slot.
    #[must_use]
    pub fn photographer(&self) -> Option<&Identity> {
        match &self.profile {
            Some(Profile::Photographer(identity)) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.profile.is_some()
    }

    fn clear(&mut self) {
        self.token = None;
        self.profile = None;
        self.hydrated = true;
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    api: Arc<dyn ProfileApi>,
    state: watch::Sender<Session>,
    generation: AtomicU64,
}

impl SessionStore {
    /// Build an empty, unhydrated store. Nothing is read until an operation
    /// runs; use [`SessionStore::start`] to also restore a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, api: Arc<dyn ProfileApi>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self { storage, api, state, generation: AtomicU64::new(0) }
    }

    /// Build the store and spawn the one-time restoration from durable
    /// storage. Returns the shared store and the restoration task handle.
    #[must_use]
    pub fn start(storage: Arc<dyn KeyValueStore>, api: Arc<dyn ProfileApi>) -> (Arc<Self>, JoinHandle<()>) {
        let store = Arc::new(Self::new(storage, api));
        let restore = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                debug!("restoring persisted session");
                store.fetch_user_profile().await;
            })
        };
        (store, restore)
    }

    /// Current session state.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Resolve once the store has hydrated, returning the state at that point.
    pub async fn wait_hydrated(&self) -> Session {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| s.hydrated).await {
            Ok(session) => session.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => self.snapshot(),
        }
    }

    /// Persist `token`, adopt it, and load the matching profile.
    ///
    /// On return the session is either fully populated or fully cleared.
    pub async fn signin(&self, token: &str) {
        if token.is_empty() {
            warn!("signin called with an empty token; ignoring");
            self.mark_hydrated();
            return;
        }

        // Supersede any fetch still running for a previous token.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let persisted = self.storage.set(AUTH_TOKEN_KEY, token).await;
        if !self.is_current(generation) {
            debug!(generation, "signin superseded while persisting its token");
            if persisted.is_ok() {
                self.discard_persisted_token(token).await;
            }
            self.mark_hydrated();
            return;
        }
        if let Err(e) = persisted {
            error!(error = %e, "failed to persist auth token; signing out");
            self.signout().await;
            return;
        }

        self.state.send_modify(|s| s.token = Some(token.to_owned()));
        self.fetch_user_profile().await;
    }

    /// Load the profile for the current token (memory first, then durable
    /// storage). No token is the anonymous state, not an error. Any lookup
    /// failure signs out. Always leaves `hydrated = true`.
    pub async fn fetch_user_profile(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(token) = self.resolve_token().await else {
            debug!("no session token; staying anonymous");
            self.mark_hydrated();
            return;
        };

        match self.api.fetch_profile(&token).await {
            Ok(identity) => {
                let role = identity.role;
                let applied = self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    s.token = Some(token);
                    s.profile = Some(Profile::from(identity));
                    s.hydrated = true;
                    true
                });
                if applied {
                    info!(%role, "session profile loaded");
                } else {
                    debug!(generation, "discarding superseded profile fetch");
                }
            }
            Err(e) if self.is_current(generation) => {
                match &e {
                    ApiError::Status { status, .. } => {
                        warn!(status, "profile lookup rejected session token; signing out");
                    }
                    ApiError::Transport(_) => {
                        error!(error = %e, "profile lookup failed; signing out");
                    }
                    _ => {
                        error!(error = %e, "profile lookup returned an unusable identity; signing out");
                    }
                }
                self.signout().await;
            }
            Err(e) => {
                debug!(generation, error = %e, "ignoring failure of superseded profile fetch");
            }
        }

        self.mark_hydrated();
    }

    /// Forget the session both in memory and in durable storage.
    pub async fn signout(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        for key in [AUTH_TOKEN_KEY, PROFILE_SNAPSHOT_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                error!(error = %e, key, "failed to remove persisted session entry");
            }
        }

        self.state.send_modify(Session::clear);
        debug!("signed out");
    }

    async fn resolve_token(&self) -> Option<String> {
        let in_memory = self.state.borrow().token.clone();
        if in_memory.is_some() {
            return in_memory;
        }
        match self.storage.get(AUTH_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                error!(error = %e, "failed to read persisted auth token; treating as signed out");
                None
            }
        }
    }

    /// Undo a token write that landed after a newer operation started: the
    /// persisted entry goes back to whatever token memory holds, or away.
    async fn discard_persisted_token(&self, token: &str) {
        match self.storage.get(AUTH_TOKEN_KEY).await {
            Ok(Some(stored)) if stored == token => {}
            Ok(_) => return,
            Err(e) => {
                error!(error = %e, "failed to read auth token while discarding it");
                return;
            }
        }
        let adopted = self.state.borrow().token.clone();
        let restored = match adopted.as_deref() {
            Some(current) if current == token => return,
            Some(current) => self.storage.set(AUTH_TOKEN_KEY, current).await,
            None => self.storage.remove(AUTH_TOKEN_KEY).await,
        };
        if let Err(e) = restored {
            error!(error = %e, "failed to discard superseded auth token");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn mark_hydrated(&self) {
        self.state.send_if_modified(|s| {
            let changed = !s.hydrated;
            s.hydrated = true;
            changed
        });
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
