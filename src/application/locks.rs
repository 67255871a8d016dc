//! Per-session mutual exclusion.
//!
//! The reference system let concurrent events for the same user interleave
//! their read-modify-write cycles; here one event holds its session's lock
//! for the whole dispatch, so same-session events serialize while distinct
//! sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::session::SessionKey;

/// Map of per-session locks. Entries with no other holders are pruned on
/// the next acquisition, keeping the map bounded by concurrency.
#[derive(Debug, Default)]
pub struct SessionLocks {
    inner: Mutex<HashMap<SessionKey, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one session, waiting behind earlier events of
    /// the same session.
    pub async fn acquire(&self, key: SessionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.retain(|held, lock| *held == key || Arc::strong_count(lock) > 1);
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn key() -> SessionKey {
        SessionKey::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn same_session_serializes() {
        let locks = Arc::new(SessionLocks::new());
        let session = key();
        let order = Arc::new(Mutex::new(Vec::new()));

        let guard = locks.acquire(session).await;

        let locks2 = locks.clone();
        let order2 = order.clone();
        let waiter = tokio::spawn(async move {
            let _guard = locks2.acquire(session).await;
            order2.lock().await.push("second");
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().await.push("first");
        drop(guard);

        waiter.await.unwrap();
        assert_eq!(*order.lock().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn distinct_sessions_run_concurrently() {
        let locks = SessionLocks::new();
        let _a = locks.acquire(key()).await;
        // A different session must not block behind the held guard.
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key()))
            .await
            .expect("second session blocked behind the first");
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = SessionLocks::new();
        for _ in 0..10 {
            let guard = locks.acquire(key()).await;
            drop(guard);
        }
        // The next acquisition prunes everything idle except its own entry.
        let _guard = locks.acquire(key()).await;
        assert!(locks.tracked().await <= 2);
    }
}
