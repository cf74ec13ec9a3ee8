//! photofolio — photographer client for the gallery backend.
//!
//! ARCHITECTURE
//! ============
//! `SessionStore` is the only stateful piece: it owns the auth token, the
//! current profile, and the hydration flag. It talks to the outside world
//! through two seams, `storage::KeyValueStore` for the persisted token and
//! `net::ProfileApi` for the profile lookup, so the binary wires real
//! implementations while tests wire in-memory fakes.
//!
//! Everything else (login, dashboard) is a thin request/response layer over
//! `net::ApiClient` that reads from or feeds into the session.

pub mod config;
pub mod dashboard;
pub mod login;
pub mod net;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use net::{ApiClient, ApiError, Identity, Role};
pub use session::{Profile, Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
