//! Declarative menu document model.
//!
//! This is the raw, author-facing shape of the menu configuration as it
//! appears in YAML. The compiler turns a [`MenuDocument`] into the
//! immutable [`super::graph::MenuGraph`] served to the dispatcher.

use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Top-level menu document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuDocument {
    /// Named menus forming the dialog graph.
    #[serde(default)]
    pub menus: BTreeMap<String, RawMenu>,

    /// Knowledge-base lookup settings.
    #[serde(default)]
    pub use_qna: QnaSettings,

    /// Global per-modifier defaults. A control that sets the matching
    /// modifier inherits id/text/reply fragments it did not specify.
    #[serde(default)]
    pub back_button: Option<RawControl>,
    #[serde(default)]
    pub close_button: Option<RawControl>,
    #[serde(default)]
    pub redirect_button: Option<RawControl>,
    #[serde(default)]
    pub appoint_spec_button: Option<RawControl>,
    #[serde(default)]
    pub appoint_random_spec_button: Option<RawControl>,
    #[serde(default)]
    pub reroute_button: Option<RawControl>,
    #[serde(default)]
    pub exec_button: Option<RawControl>,
    #[serde(default)]
    pub save_to_var: Option<RawControl>,
    #[serde(default)]
    pub ticket_button: Option<RawControl>,

    /// Message sent before the start menu on first contact.
    #[serde(default)]
    pub greeting_message: String,

    /// Whether the greeting message is sent at all.
    #[serde(default)]
    pub first_greeting: bool,

    /// Configurable user-facing error strings.
    #[serde(default)]
    pub error_messages: ErrorMessages,
}

impl MenuDocument {
    /// Parse a document from YAML text.
    pub fn from_yaml(input: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(input)
    }
}

/// Knowledge-base enablement.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct QnaSettings {
    #[serde(default)]
    pub enabled: bool,
}

/// A single named menu before compilation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMenu {
    /// Reply fragments rendered on entry.
    #[serde(default)]
    pub answer: Vec<RawAnswer>,

    /// Controls offered to the user.
    #[serde(default)]
    pub buttons: Vec<RawControl>,

    /// Control executed unconditionally right after rendering.
    #[serde(default)]
    pub do_button: Option<Box<RawControl>>,

    /// Suppress knowledge-base fallback for this menu.
    #[serde(default)]
    pub qna_disable: bool,
}

/// One reply fragment: chat text and/or a file with a caption.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnswer {
    #[serde(default)]
    pub chat: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_text: Option<String>,
}

impl RawAnswer {
    pub fn is_empty(&self) -> bool {
        self.chat.as_deref().unwrap_or("").is_empty()
            && self.file.as_deref().unwrap_or("").is_empty()
    }
}

/// A control as written by the menu author. At most one of the action
/// modifiers may be set; the compiler enforces this.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawControl {
    /// Control id, matched against pressed-button ids.
    #[serde(default)]
    pub id: String,

    /// Display text.
    #[serde(default)]
    pub text: String,

    /// Reply fragments rendered when the control fires.
    #[serde(default)]
    pub chat: Vec<RawAnswer>,

    /// Close the current treatment.
    #[serde(default)]
    pub close_button: bool,

    /// Escalate the treatment to a human specialist.
    #[serde(default)]
    pub redirect_button: bool,

    /// Navigate back through the session history.
    #[serde(default)]
    pub back_button: bool,

    /// Appoint a specific specialist by id.
    #[serde(default)]
    pub appoint_spec_button: Option<Uuid>,

    /// Appoint a random available specialist from this set.
    #[serde(default)]
    pub appoint_random_spec_button: Option<Vec<Uuid>>,

    /// Reroute the treatment to another line.
    #[serde(default)]
    pub reroute_button: Option<Uuid>,

    /// Run a server-side command and render its output.
    #[serde(default)]
    pub exec_button: Option<String>,

    /// Capture the next free-text message into a variable.
    #[serde(default)]
    pub save_to_var: Option<RawCapture>,

    /// Start the ticket-creation wizard.
    #[serde(default)]
    pub ticket_button: Option<RawTicket>,

    /// Destination menu.
    #[serde(default, rename = "goto")]
    pub goto: Option<String>,

    /// Inline nested submenu; flattened into a top-level menu.
    #[serde(default, rename = "menu")]
    pub nested_menu: Option<Box<RawNestedMenu>>,
}

/// Inline submenu block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNestedMenu {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub answer: Vec<RawAnswer>,
    #[serde(default)]
    pub buttons: Vec<RawControl>,
    #[serde(default)]
    pub qna_disable: bool,
}

/// Free-text capture settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCapture {
    /// Variable receiving the user's message.
    #[serde(default)]
    pub var_name: String,

    /// Prompt sent when the capture starts.
    #[serde(default)]
    pub send_text: Option<String>,

    /// Choices offered alongside free-text input.
    #[serde(default)]
    pub offer_options: Vec<String>,

    /// Control executed once the value arrives.
    #[serde(default)]
    pub do_button: Option<Box<RawControl>>,
}

/// Ticket wizard settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTicket {
    /// Channel the ticket is filed under.
    #[serde(default)]
    pub channel_id: Option<Uuid>,

    /// Template rendering the collected draft at the confirmation step.
    #[serde(default)]
    pub ticket_info: String,

    /// The five collected fields.
    #[serde(default)]
    pub data: Option<RawTicketData>,

    /// Destination after completion or cancellation.
    #[serde(default, rename = "goto")]
    pub goto: Option<String>,
}

/// Field specs of the ticket wizard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTicketData {
    #[serde(default)]
    pub theme: Option<RawTicketField>,
    #[serde(default)]
    pub description: Option<RawTicketField>,
    #[serde(default)]
    pub executor: Option<RawTicketField>,
    #[serde(default)]
    pub service: Option<RawTicketField>,
    #[serde(default, rename = "type")]
    pub service_type: Option<RawTicketField>,
}

/// One wizard field: a prompt, an optional default that skips the step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTicketField {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "value")]
    pub default_value: Option<String>,
}

/// Configurable user-facing error strings. Unset entries fall back to
/// built-in defaults at compile time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorMessages {
    #[serde(default)]
    pub command_unknown: String,
    #[serde(default)]
    pub button_processing: String,
    #[serde(default)]
    pub failed_send_file: String,
    #[serde(default)]
    pub specialist_not_available: String,
    #[serde(default)]
    pub specialists_not_available: String,
    #[serde(default)]
    pub line_not_available: String,
    #[serde(default)]
    pub step_cannot_be_skipped: String,
    #[serde(default)]
    pub received_incorrect_value: String,
    #[serde(default)]
    pub expected_button_press: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let doc = MenuDocument::from_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "Pick an option"
    buttons:
      - id: "1"
        text: "About"
        goto: about
  about:
    answer:
      - chat: "We are a helpdesk"
    buttons:
      - id: "0"
        text: "Back"
        back_button: true
"#,
        )
        .unwrap();

        assert_eq!(doc.menus.len(), 2);
        let start = &doc.menus["start"];
        assert_eq!(start.buttons.len(), 1);
        assert_eq!(start.buttons[0].goto.as_deref(), Some("about"));
        assert!(doc.menus["about"].buttons[0].back_button);
    }

    #[test]
    fn parses_nested_submenu_and_capture() {
        let doc = MenuDocument::from_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "Hello"
    buttons:
      - text: "Nested"
        menu:
          id: inner
          answer:
            - chat: "Inner"
          buttons:
            - text: "Leave a note"
              save_to_var:
                var_name: note
                do_button:
                  chat:
                    - chat: "Saved {{var.note}}"
"#,
        )
        .unwrap();

        let nested = doc.menus["start"].buttons[0].nested_menu.as_ref().unwrap();
        assert_eq!(nested.id, "inner");
        let capture = nested.buttons[0].save_to_var.as_ref().unwrap();
        assert_eq!(capture.var_name, "note");
        assert!(capture.do_button.is_some());
    }

    #[test]
    fn parses_ticket_button_with_defaults() {
        let doc = MenuDocument::from_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "Hello"
    buttons:
      - text: "File a request"
        ticket_button:
          channel_id: bb296731-3d58-4c4a-8227-315bdc2bf3ff
          ticket_info: "{{ticket.theme}}: {{ticket.description}}"
          data:
            theme:
              text: "Subject?"
            description:
              value: "created from chat"
            executor:
              text: "Who should handle it?"
            service:
              text: "Which service?"
            type:
              text: "Which kind of work?"
"#,
        )
        .unwrap();

        let ticket = doc.menus["start"].buttons[0].ticket_button.as_ref().unwrap();
        assert!(ticket.channel_id.is_some());
        let data = ticket.data.as_ref().unwrap();
        assert_eq!(
            data.description.as_ref().unwrap().default_value.as_deref(),
            Some("created from chat")
        );
        assert!(data.theme.as_ref().unwrap().default_value.is_none());
    }
}
