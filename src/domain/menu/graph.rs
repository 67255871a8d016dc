//! Compiled menu graph.
//!
//! The graph is immutable after compilation and shared behind an `Arc`;
//! a reload builds a whole new graph and swaps it in (see
//! [`super::registry::MenuRegistry`]). Controls carry exactly one
//! [`Action`], which encodes the at-most-one-modifier invariant in the
//! type instead of in runtime checks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// State entered on first contact and after terminal transitions.
pub const GREETINGS: &str = "greetings";
/// The root menu. Must be present in every document.
pub const START: &str = "start";
/// Terminal menu ("anything else?").
pub const FINAL: &str = "final_menu";
/// Menu rendered when the knowledge base has no answer.
pub const FAIL_QNA: &str = "fail_qna_menu";
/// State awaiting a free-text value.
pub const WAIT_SEND: &str = "wait_send_menu";
/// State hosting the ticket wizard.
pub const CREATE_TICKET: &str = "create_ticket";
/// Pseudo-destination marking the wizard's "one field back" move.
pub const CREATE_TICKET_PREV_STAGE: &str = "create_ticket_prev_stage";

/// Reserved variable holding the name of the variable the next inbound
/// message must fill. Menu authors may not capture into it.
pub const PENDING_INPUT_VAR: &str = "PENDING_INPUT";

/// One reply fragment: chat text and/or a file attachment. A fragment
/// with both renders the text first, then the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFragment {
    pub text: Option<String>,
    pub file: Option<String>,
    pub caption: Option<String>,
}

impl ReplyFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            file: None,
            caption: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().unwrap_or("").is_empty()
            && self.file.as_deref().unwrap_or("").is_empty()
    }
}

/// Free-text capture: remember the variable to fill and the control to
/// run once the value arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSpec {
    pub var_name: String,
    pub send_text: Option<String>,
    pub offer_options: Vec<String>,
    pub continuation: Box<Control>,
}

/// One wizard field: prompt text plus an optional default that skips the
/// step entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub prompt: String,
    pub default_value: Option<String>,
}

/// The five collected ticket fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFields {
    pub theme: FieldSpec,
    pub description: FieldSpec,
    pub executor: FieldSpec,
    pub service: FieldSpec,
    pub service_type: FieldSpec,
}

/// Ticket wizard entry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSpec {
    pub channel_id: Uuid,
    pub info_template: String,
    pub fields: TicketFields,
    /// Destination after completion or cancellation.
    pub goto: String,
}

/// The single action a control performs when pressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Render the destination menu.
    Navigate,
    /// Pop the navigation history.
    Back,
    /// Close the treatment.
    Close,
    /// Escalate to a human specialist.
    Redirect,
    /// Appoint a specific specialist.
    AppointSpecialist(Uuid),
    /// Appoint a random available specialist from the set.
    AppointRandomFrom(Vec<Uuid>),
    /// Reroute the treatment to another line.
    RerouteLine(Uuid),
    /// Run a server-side command template.
    Exec(String),
    /// Capture the next free-text message.
    Capture(CaptureSpec),
    /// Start the ticket wizard.
    Ticket(TicketSpec),
}

/// A selectable control within a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub text: String,
    /// Fragments rendered when the control fires, before its action.
    pub replies: Vec<ReplyFragment>,
    pub action: Action,
    /// Destination menu; `None` only for actions that compute their own
    /// destination (back, close, redirect, appoint, reroute, capture,
    /// ticket).
    pub goto: Option<String>,
}

impl Control {
    pub fn ticket_spec(&self) -> Option<&TicketSpec> {
        match &self.action {
            Action::Ticket(spec) => Some(spec),
            _ => None,
        }
    }
}

/// A named node of the dialog graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    pub replies: Vec<ReplyFragment>,
    pub controls: Vec<Control>,
    /// Control executed unconditionally right after rendering.
    pub auto_trigger: Option<Control>,
    pub qna_disabled: bool,
}

/// Fully resolved user-facing error strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTexts {
    pub command_unknown: String,
    pub button_processing: String,
    pub failed_send_file: String,
    pub specialist_not_available: String,
    pub specialists_not_available: String,
    pub line_not_available: String,
    pub step_cannot_be_skipped: String,
    pub received_incorrect_value: String,
    pub expected_button_press: String,
}

impl Default for ErrorTexts {
    fn default() -> Self {
        Self {
            command_unknown: "Unknown command. Please try again".to_string(),
            button_processing: "Something went wrong while handling your request".to_string(),
            failed_send_file: "Error: the attachment could not be sent".to_string(),
            specialist_not_available: "The selected specialist is not available".to_string(),
            specialists_not_available: "No specialists in this area are available".to_string(),
            line_not_available: "The selected line is not available".to_string(),
            step_cannot_be_skipped: "This step cannot be skipped".to_string(),
            received_incorrect_value: "That value is not valid. Please try again".to_string(),
            expected_button_press: "A button press was expected. Please try again".to_string(),
        }
    }
}

/// Immutable compiled dialog graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuGraph {
    pub(crate) nodes: HashMap<String, MenuNode>,
    pub(crate) qna_enabled: bool,
    pub(crate) greeting_message: String,
    pub(crate) first_greeting: bool,
    pub(crate) errors: ErrorTexts,
}

impl MenuGraph {
    pub fn node(&self, name: &str) -> Option<&MenuNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn errors(&self) -> &ErrorTexts {
        &self.errors
    }

    pub fn greeting_message(&self) -> &str {
        &self.greeting_message
    }

    pub fn first_greeting(&self) -> bool {
        self.first_greeting
    }

    /// Whether a knowledge-base lookup may run while at `state`.
    pub fn qna_allowed(&self, state: &str) -> bool {
        self.qna_enabled
            && self
                .node(state)
                .map(|node| !node.qna_disabled)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_fragment_emptiness() {
        assert!(ReplyFragment::default().is_empty());
        assert!(!ReplyFragment::text("hi").is_empty());
        let file_only = ReplyFragment {
            text: None,
            file: Some("guide.pdf".to_string()),
            caption: None,
        };
        assert!(!file_only.is_empty());
    }

    #[test]
    fn qna_allowed_respects_node_flag() {
        let mut graph = MenuGraph {
            qna_enabled: true,
            ..Default::default()
        };
        graph.nodes.insert(
            "open".to_string(),
            MenuNode {
                replies: vec![ReplyFragment::text("hi")],
                ..Default::default()
            },
        );
        graph.nodes.insert(
            "muted".to_string(),
            MenuNode {
                replies: vec![ReplyFragment::text("hi")],
                qna_disabled: true,
                ..Default::default()
            },
        );

        assert!(graph.qna_allowed("open"));
        assert!(!graph.qna_allowed("muted"));
        assert!(!graph.qna_allowed("missing"));
    }

    #[test]
    fn qna_disabled_globally_wins() {
        let mut graph = MenuGraph::default();
        graph.nodes.insert("open".to_string(), MenuNode::default());
        assert!(!graph.qna_allowed("open"));
    }

    #[test]
    fn control_round_trips_through_serde() {
        let control = Control {
            id: "1".to_string(),
            text: "Save".to_string(),
            replies: vec![ReplyFragment::text("Saving")],
            action: Action::Capture(CaptureSpec {
                var_name: "note".to_string(),
                send_text: None,
                offer_options: vec!["yes".to_string()],
                continuation: Box::new(Control {
                    id: String::new(),
                    text: String::new(),
                    replies: vec![],
                    action: Action::Navigate,
                    goto: Some(FINAL.to_string()),
                }),
            }),
            goto: None,
        };

        let json = serde_json::to_string(&control).unwrap();
        let back: Control = serde_json::from_str(&json).unwrap();
        assert_eq!(control, back);
    }
}
