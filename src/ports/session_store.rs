//! Session store port.
//!
//! A time-bounded key-value store for session records. Expiry is the
//! store's concern; there is no explicit deletion protocol beyond
//! [`SessionStore::remove`].

use async_trait::async_trait;

use crate::domain::session::{SessionKey, SessionState};

/// Errors from the session store.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("failed to serialize session state: {0}")]
    Serialization(String),

    #[error("failed to deserialize session state: {0}")]
    Deserialization(String),

    #[error("session store backend error: {0}")]
    Backend(String),
}

/// Port for persisting session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record for a key. Returns `None` when absent or expired.
    async fn get(&self, key: &SessionKey) -> Result<Option<SessionState>, SessionStoreError>;

    /// Store the record for a key, refreshing its TTL.
    async fn put(&self, key: &SessionKey, state: &SessionState) -> Result<(), SessionStoreError>;

    /// Drop the record for a key.
    async fn remove(&self, key: &SessionKey) -> Result<(), SessionStoreError>;
}
