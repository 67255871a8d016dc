//! In-memory session store with time-to-live expiry.
//!
//! Records are stored serialized, so every write is a full
//! serialize-and-store cycle and a poisoned record surfaces as a
//! deserialization error instead of corrupting neighbors. Expiry is lazy
//! on read; [`InMemorySessionStore::purge_expired`] sweeps the rest from
//! a background task.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::session::{SessionKey, SessionState};
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: String,
    stored_at: DateTime<Utc>,
}

/// In-memory TTL store for session records.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<SessionKey, StoredEntry>>>,
    ttl: ChronoDuration,
}

impl InMemorySessionStore {
    /// Create a store whose records expire `ttl` after their last write.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
        }
    }

    /// Number of live (unexpired) records.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !self.expired(entry, now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all expired records. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !self.expired(entry, now));
        before - entries.len()
    }

    fn expired(&self, entry: &StoredEntry, now: DateTime<Utc>) -> bool {
        now - entry.stored_at >= self.ttl
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<SessionState>, SessionStoreError> {
        let now = Utc::now();
        let (payload, expired) = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if self.expired(entry, now) => (None, true),
                Some(entry) => (Some(entry.payload.clone()), false),
                None => (None, false),
            }
        };

        if expired {
            self.entries.write().await.remove(key);
            return Ok(None);
        }
        let Some(payload) = payload else {
            return Ok(None);
        };

        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|err| SessionStoreError::Deserialization(err.to_string()))
    }

    async fn put(&self, key: &SessionKey, state: &SessionState) -> Result<(), SessionStoreError> {
        let payload = serde_json::to_string(state)
            .map_err(|err| SessionStoreError::Serialization(err.to_string()))?;

        let mut entries = self.entries.write().await;
        entries.insert(
            *key,
            StoredEntry {
                payload,
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &SessionKey) -> Result<(), SessionStoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_key() -> SessionKey {
        SessionKey::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_store_round_trips_state() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let key = test_key();

        let mut state = SessionState::new();
        state.change_state("support");
        state.set_var("city", "Kazan");

        store.put(&key, &state).await.unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();

        assert_eq!(loaded.current_state, "support");
        assert_eq!(loaded.var("city"), Some("Kazan"));
    }

    #[tokio::test]
    async fn test_store_get_missing_returns_none() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        assert!(store.get(&test_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_expires_records() {
        let store = InMemorySessionStore::new(Duration::from_millis(10));
        let key = test_key();
        store.put(&key, &SessionState::new()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_purge_sweeps_expired() {
        let store = InMemorySessionStore::new(Duration::from_millis(10));
        store.put(&test_key(), &SessionState::new()).await.unwrap();
        store.put(&test_key(), &SessionState::new()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired().await, 2);
    }

    #[tokio::test]
    async fn test_store_put_refreshes_ttl() {
        let store = InMemorySessionStore::new(Duration::from_millis(50));
        let key = test_key();
        store.put(&key, &SessionState::new()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.put(&key, &SessionState::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Still alive: the second write restarted the clock.
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_remove_drops_record() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let key = test_key();
        store.put(&key, &SessionState::new()).await.unwrap();
        store.remove(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
