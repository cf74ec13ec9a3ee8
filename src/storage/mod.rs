//! Durable key-value storage for session data.
//!
//! DESIGN
//! ======
//! The session store only needs `get`/`set`/`remove` on string keys. Each call
//! acquires and releases the underlying handle on its own; nothing spans
//! calls, so a crash between two writes leaves each key individually valid.

mod file;
mod memory;

use std::path::PathBuf;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key holding the opaque auth token.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Key holding the JSON snapshot of the profile returned at login.
pub const PROFILE_SNAPSHOT_KEY: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("storage encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Async string key-value store.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
