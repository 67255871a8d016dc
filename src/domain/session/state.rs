//! Per-conversation session state.
//!
//! One record per (user, line) pair, kept in a time-bounded store. The
//! history stack backs the "Back" controls; boundary states clear it,
//! wizard-internal states never enter it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::menu::{
    Control, CREATE_TICKET, CREATE_TICKET_PREV_STAGE, FAIL_QNA, FINAL, GREETINGS,
    PENDING_INPUT_VAR, START, WAIT_SEND,
};

use super::ticket::TicketDraft;

/// States that terminate a navigation episode; reaching one clears the
/// history stack.
const BOUNDARY_STATES: [&str; 4] = [FAIL_QNA, FINAL, START, GREETINGS];

/// States internal to a capture or the ticket wizard; never recorded in
/// the history stack.
const TRANSIENT_STATES: [&str; 3] = [CREATE_TICKET, CREATE_TICKET_PREV_STAGE, WAIT_SEND];

/// Key of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: Uuid,
    pub line_id: Uuid,
}

impl SessionKey {
    pub fn new(user_id: Uuid, line_id: Uuid) -> Self {
        Self { user_id, line_id }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.line_id)
    }
}

/// Subscriber profile snapshot taken on first contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub patronymic: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Owner counterpart, scoping which ticket metadata applies.
    #[serde(default)]
    pub counterpart_owner_id: Option<Uuid>,
}

/// A specialist as listed by the agent directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialist {
    pub user_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub patronymic: String,
}

impl Specialist {
    /// Display name as offered on wizard keyboards.
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.surname, self.name, self.patronymic)
            .trim()
            .to_string()
    }
}

/// The per-session conversation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Menu states visited since the last boundary.
    #[serde(default)]
    pub history: Vec<String>,

    pub previous_state: String,
    pub current_state: String,

    /// Subscriber profile captured when the record was created.
    #[serde(default)]
    pub user: UserProfile,

    /// Free-form variable bag, template-visible as `{{var.*}}`.
    #[serde(default)]
    pub vars: HashMap<String, String>,

    /// In-progress ticket draft.
    #[serde(default)]
    pub ticket: TicketDraft,

    /// Control suspended for execution after a capture or wizard run.
    #[serde(default)]
    pub continuation: Option<Control>,

    /// Last mutation time, used by the store's TTL.
    pub touched_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            previous_state: GREETINGS.to_string(),
            current_state: GREETINGS.to_string(),
            user: UserProfile::default(),
            vars: HashMap::new(),
            ticket: TicketDraft::default(),
            continuation: None,
            touched_at: Utc::now(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `to`, remembering the state left behind. A transition to
    /// the current state is a no-op.
    pub fn change_state(&mut self, to: &str) {
        if self.current_state == to {
            return;
        }
        self.previous_state = std::mem::replace(&mut self.current_state, to.to_string());
        self.history_append(to);
    }

    /// Record a visited state. Boundary states clear the stack (and the
    /// volatile fields with it), transient states are skipped, and a
    /// state equal to the top of stack is not duplicated.
    pub fn history_append(&mut self, state: &str) {
        if BOUNDARY_STATES.contains(&state) {
            self.history_clear();
            return;
        }
        if TRANSIENT_STATES.contains(&state) {
            return;
        }
        if self.history.last().map(String::as_str) != Some(state) {
            self.history.push(state.to_string());
        }
    }

    /// Pop one entry; `previous_state` becomes the new top of stack, or
    /// greetings when the stack runs out.
    pub fn history_back(&mut self) {
        self.history.pop();
        self.previous_state = self
            .history
            .last()
            .cloned()
            .unwrap_or_else(|| GREETINGS.to_string());
    }

    /// Drop the whole stack together with the volatile fields.
    pub fn history_clear(&mut self) {
        self.history.clear();
        self.clear_volatile();
    }

    /// Clear the capture target, suspended continuation and ticket draft.
    pub fn clear_volatile(&mut self) {
        if let Some(slot) = self.vars.get_mut(PENDING_INPUT_VAR) {
            slot.clear();
        }
        self.continuation = None;
        self.ticket = TicketDraft::default();
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// The name of the variable the next inbound message must fill, if a
    /// capture is in flight.
    pub fn pending_input(&self) -> Option<&str> {
        self.var(PENDING_INPUT_VAR).filter(|v| !v.is_empty())
    }

    /// Where a back press lands: the remembered previous state, except
    /// that greetings resolves to the start menu.
    pub fn back_target(&self) -> &str {
        if self.previous_state == GREETINGS {
            START
        } else {
            &self.previous_state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_greetings() {
        let state = SessionState::new();
        assert_eq!(state.current_state, GREETINGS);
        assert_eq!(state.previous_state, GREETINGS);
        assert!(state.history.is_empty());
    }

    #[test]
    fn change_state_tracks_previous() {
        let mut state = SessionState::new();
        state.change_state("support");
        assert_eq!(state.previous_state, GREETINGS);
        assert_eq!(state.current_state, "support");

        // Re-entering the same state changes nothing.
        state.change_state("support");
        assert_eq!(state.previous_state, GREETINGS);
    }

    #[test]
    fn history_skips_transient_states() {
        let mut state = SessionState::new();
        state.history_append("support");
        state.history_append(CREATE_TICKET);
        state.history_append(WAIT_SEND);
        assert_eq!(state.history, vec!["support"]);
    }

    #[test]
    fn history_deduplicates_top_of_stack() {
        let mut state = SessionState::new();
        state.history_append("support");
        state.history_append("support");
        state.history_append("billing");
        assert_eq!(state.history, vec!["support", "billing"]);
    }

    #[test]
    fn boundary_state_clears_history_and_volatile() {
        let mut state = SessionState::new();
        state.history_append("support");
        state.set_var(PENDING_INPUT_VAR, "note");
        state.ticket.theme = "broken printer".to_string();

        state.history_append(FINAL);

        assert!(state.history.is_empty());
        assert_eq!(state.pending_input(), None);
        assert_eq!(state.ticket, TicketDraft::default());
    }

    #[test]
    fn back_after_final_lands_on_greetings() {
        let mut state = SessionState::new();
        state.history_append(FINAL);
        state.history_back();
        assert_eq!(state.previous_state, GREETINGS);
        assert_eq!(state.back_target(), START);
    }

    #[test]
    fn back_walks_the_stack() {
        let mut state = SessionState::new();
        state.history_append("a");
        state.history_append("b");
        state.history_append("c");

        state.history_back();
        assert_eq!(state.previous_state, "b");
        state.history_back();
        assert_eq!(state.previous_state, "a");
        state.history_back();
        assert_eq!(state.previous_state, GREETINGS);
    }

    #[test]
    fn specialist_full_name_trims_missing_parts() {
        let spec = Specialist {
            user_id: Uuid::new_v4(),
            name: "Anna".to_string(),
            surname: "Petrova".to_string(),
            patronymic: String::new(),
        };
        assert_eq!(spec.full_name(), "Petrova Anna");
    }
}
