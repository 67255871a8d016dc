//! Session service: read-modify-write cycles over the session store.
//!
//! Every mutation re-serializes and stores the whole record, mirroring the
//! store's cache semantics. Creation populates the subscriber profile once;
//! a profile lookup failure is tolerated and logged.

use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::domain::menu::{Control, PENDING_INPUT_VAR};
use crate::domain::session::{SessionKey, SessionState, TicketDraft};
use crate::ports::{MessageGateway, SessionStore, SessionStoreError};

/// Application-level session operations shared by the dispatcher and the
/// ticket wizard.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn MessageGateway>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, gateway: Arc<dyn MessageGateway>) -> Self {
        Self { store, gateway }
    }

    /// Load the record for `key`, creating it with defaults on first
    /// contact. Creation captures the subscriber profile; a corrupt
    /// stored record is discarded and recreated.
    pub async fn load_or_create(
        &self,
        key: &SessionKey,
    ) -> Result<SessionState, SessionStoreError> {
        match self.store.get(key).await {
            Ok(Some(state)) => return Ok(state),
            Ok(None) => {}
            Err(SessionStoreError::Deserialization(reason)) => {
                warn!(session = %key, %reason, "discarding corrupt session record");
                self.store.remove(key).await?;
            }
            Err(err) => return Err(err),
        }

        let mut state = SessionState::new();
        match self.gateway.subscriber_profile(key.user_id).await {
            Ok(profile) => state.user = profile,
            Err(err) => warn!(session = %key, error = %err, "subscriber profile lookup failed"),
        }
        self.persist(key, &mut state).await?;
        Ok(state)
    }

    /// Serialize and store the record, refreshing its touch time.
    pub async fn persist(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
    ) -> Result<(), SessionStoreError> {
        state.touched_at = Utc::now();
        self.store.put(key, state).await
    }

    /// Transition to `to` (no-op when already there) and record it in the
    /// navigation history.
    pub async fn change_state(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
        to: &str,
    ) -> Result<(), SessionStoreError> {
        if state.current_state == to {
            return Ok(());
        }
        state.change_state(to);
        self.persist(key, state).await
    }

    pub async fn change_variable(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
        name: &str,
        value: &str,
    ) -> Result<(), SessionStoreError> {
        state.set_var(name, value);
        self.persist(key, state).await
    }

    /// Remember which variable the next inbound message must fill.
    pub async fn set_pending_input(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
        var_name: &str,
    ) -> Result<(), SessionStoreError> {
        self.change_variable(key, state, PENDING_INPUT_VAR, var_name)
            .await
    }

    /// Mutate the ticket draft in place and store the record.
    pub async fn change_ticket(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
        mutate: impl FnOnce(&mut TicketDraft) + Send,
    ) -> Result<(), SessionStoreError> {
        mutate(&mut state.ticket);
        self.persist(key, state).await
    }

    pub async fn set_continuation(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
        control: Option<Control>,
    ) -> Result<(), SessionStoreError> {
        state.continuation = control;
        self.persist(key, state).await
    }

    /// Clear the capture target, continuation and draft.
    pub async fn clear_volatile(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
    ) -> Result<(), SessionStoreError> {
        state.clear_volatile();
        self.persist(key, state).await
    }

    pub async fn history_append(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
        visited: &str,
    ) -> Result<(), SessionStoreError> {
        state.history_append(visited);
        self.persist(key, state).await
    }

    pub async fn history_back(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
    ) -> Result<(), SessionStoreError> {
        state.history_back();
        self.persist(key, state).await
    }

    /// Clear the stack and the volatile fields with it.
    pub async fn history_clear(
        &self,
        key: &SessionKey,
        state: &mut SessionState,
    ) -> Result<(), SessionStoreError> {
        state.history_clear();
        self.persist(key, state).await
    }
}
