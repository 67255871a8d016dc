//! Menu document compiler.
//!
//! Turns a [`MenuDocument`] into an immutable [`MenuGraph`]:
//!
//! 1. recursively flattens inline submenus into top-level states,
//! 2. injects the implicit terminal destination for controls without a
//!    continuation,
//! 3. applies document-wide per-modifier control defaults,
//! 4. validates every structural invariant fail-fast,
//! 5. synthesizes the reserved states the document omitted.
//!
//! Compilation is a pure function over the document; nothing is published
//! until the whole graph has validated.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use uuid::Uuid;

use super::document::{
    ErrorMessages, MenuDocument, RawAnswer, RawControl, RawMenu, RawTicketField,
};
use super::graph::{
    Action, CaptureSpec, Control, ErrorTexts, FieldSpec, MenuGraph, MenuNode, ReplyFragment,
    TicketFields, TicketSpec, CREATE_TICKET, CREATE_TICKET_PREV_STAGE, FAIL_QNA, FINAL,
    PENDING_INPUT_VAR, START, WAIT_SEND,
};

/// Compile-time validation failure. Every variant names the offending
/// state and, where relevant, the control and nesting depth.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("failed to read menu document: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse menu document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("menu '{START}' is missing from the document")]
    MissingStartMenu,

    #[error("menu '{state}' has no buttons and no do_button")]
    NoControls { state: String },

    #[error("menu '{state}' sets both buttons and do_button")]
    ButtonsConflictWithAutoTrigger { state: String },

    #[error("menu '{state}' has no non-empty reply fragment (depth {depth})")]
    EmptyReply { state: String, depth: usize },

    #[error("nested submenu without an id: {state} {{{control}}} depth {depth}")]
    NestedMenuMissingId {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("a menu with id '{id}' already exists: {state} {{{control}}} depth {depth}")]
    DuplicateMenuId {
        id: String,
        state: String,
        control: String,
        depth: usize,
    },

    #[error("a button may carry only one action modifier: {state} {{{control}}} depth {depth}")]
    MultipleModifiers {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("a back button may not carry goto: {state} {{{control}}} depth {depth}")]
    BackWithDestination {
        state: String,
        control: String,
        depth: usize,
    },

    #[error(
        "button leads to nonexistent menu '{target}': {state} {{{control}}} depth {depth}"
    )]
    UnknownDestination {
        target: String,
        state: String,
        control: String,
        depth: usize,
    },

    #[error("button has no destination: {state} {{{control}}} depth {depth}")]
    MissingDestination {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("button text cannot be empty: {state} {{{control}}} depth {depth}")]
    EmptyControlText {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("save_to_var is missing var_name: {state} {{{control}}} depth {depth}")]
    CaptureMissingVarName {
        state: String,
        control: String,
        depth: usize,
    },

    #[error(
        "save_to_var uses the reserved variable name '{PENDING_INPUT_VAR}': {state} {{{control}}} depth {depth}"
    )]
    CaptureReservedVarName {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("save_to_var is missing do_button: {state} {{{control}}} depth {depth}")]
    CaptureMissingContinuation {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("save_to_var do_button may not be a back button: {state} {{{control}}} depth {depth}")]
    CaptureBackContinuation {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("ticket_button is missing channel_id: {state} {{{control}}} depth {depth}")]
    TicketMissingChannel {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("ticket_button is missing ticket_info: {state} {{{control}}} depth {depth}")]
    TicketMissingInfo {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("ticket_button is missing data: {state} {{{control}}} depth {depth}")]
    TicketMissingData {
        state: String,
        control: String,
        depth: usize,
    },

    #[error("ticket_button field '{field}' is missing: {state} {{{control}}} depth {depth}")]
    TicketFieldMissing {
        field: &'static str,
        state: String,
        control: String,
        depth: usize,
    },

    #[error(
        "ticket_button field '{field}' needs text or value: {state} {{{control}}} depth {depth}"
    )]
    TicketFieldEmpty {
        field: &'static str,
        state: String,
        control: String,
        depth: usize,
    },

    #[error(
        "ticket_button field '{field}' default value is not an id: {state} {{{control}}} depth {depth}"
    )]
    TicketDefaultNotId {
        field: &'static str,
        state: String,
        control: String,
        depth: usize,
    },
}

/// Compile a document into a graph. Pure: the document is not modified,
/// and no partially built graph is ever observable.
pub fn compile(document: &MenuDocument) -> Result<MenuGraph, MenuError> {
    let mut menus = document.menus.clone();

    // Flatten nested submenus and inject implicit destinations.
    let mut flattened = BTreeMap::new();
    for (name, menu) in &menus {
        let mut menu = menu.clone();
        menu.buttons = flatten_controls(&menu.buttons, name, 1, &mut flattened, &menus)?;
        if let Some(auto) = menu.do_button.take() {
            let rewritten = flatten_controls(&[*auto], name, 1, &mut flattened, &menus)?;
            menu.do_button = rewritten.into_iter().next().map(Box::new);
        }
        flattened.insert(name.clone(), menu);
    }
    menus = flattened;

    if !menus.contains_key(START) {
        return Err(MenuError::MissingStartMenu);
    }

    // Synthesize reserved states the document omitted.
    menus.entry(FINAL.to_string()).or_insert_with(default_final_menu);
    menus
        .entry(WAIT_SEND.to_string())
        .or_insert_with(default_wait_send_menu);
    if document.use_qna.enabled {
        menus
            .entry(FAIL_QNA.to_string())
            .or_insert_with(default_fail_qna_menu);
    }
    // The wizard's button table always replaces whatever the author wrote.
    menus.insert(CREATE_TICKET.to_string(), wizard_button_table());

    let names: BTreeSet<String> = menus.keys().cloned().collect();
    let compiler = Compiler { document, names };

    let mut nodes = std::collections::HashMap::new();
    for (name, menu) in &menus {
        nodes.insert(name.clone(), compiler.convert_menu(name, menu)?);
    }

    let greeting_message = if document.greeting_message.is_empty() {
        "Hello.".to_string()
    } else {
        document.greeting_message.clone()
    };

    Ok(MenuGraph {
        nodes,
        qna_enabled: document.use_qna.enabled,
        greeting_message,
        first_greeting: document.first_greeting,
        errors: resolve_error_texts(&document.error_messages),
    })
}

/// Short control label used in error messages.
fn control_label(control: &RawControl) -> String {
    format!("id={} text={}", control.id, control.text)
}

/// Rewrite a control list: flatten nested submenus into `registered`,
/// point the enclosing control at the new state, and inject the implicit
/// terminal destination for controls with no continuation of their own.
fn flatten_controls(
    controls: &[RawControl],
    state: &str,
    depth: usize,
    registered: &mut BTreeMap<String, RawMenu>,
    existing: &BTreeMap<String, RawMenu>,
) -> Result<Vec<RawControl>, MenuError> {
    let mut out = Vec::with_capacity(controls.len());
    for control in controls {
        let mut control = control.clone();

        // Menus without a continuation fall through to the terminal state.
        if control.save_to_var.is_none()
            && control.nested_menu.is_none()
            && !control.back_button
            && state != FINAL
            && control.goto.is_none()
        {
            control.goto = Some(FINAL.to_string());
        }

        if let Some(nested) = control.nested_menu.take() {
            if nested.id.is_empty() {
                return Err(MenuError::NestedMenuMissingId {
                    state: state.to_string(),
                    control: control_label(&control),
                    depth,
                });
            }
            if existing.contains_key(&nested.id) || registered.contains_key(&nested.id) {
                return Err(MenuError::DuplicateMenuId {
                    id: nested.id.clone(),
                    state: state.to_string(),
                    control: control_label(&control),
                    depth,
                });
            }

            let buttons =
                flatten_controls(&nested.buttons, state, depth + 1, registered, existing)?;
            registered.insert(
                nested.id.clone(),
                RawMenu {
                    answer: nested.answer.clone(),
                    buttons,
                    do_button: None,
                    qna_disable: nested.qna_disable,
                },
            );
            control.goto = Some(nested.id.clone());
        }

        if let Some(capture) = control.save_to_var.as_mut() {
            if let Some(continuation) = capture.do_button.take() {
                let rewritten =
                    flatten_controls(&[*continuation], state, depth + 1, registered, existing)?;
                capture.do_button = rewritten.into_iter().next().map(Box::new);
            }
        }

        out.push(control);
    }
    Ok(out)
}

struct Compiler<'a> {
    document: &'a MenuDocument,
    names: BTreeSet<String>,
}

impl Compiler<'_> {
    fn convert_menu(&self, name: &str, menu: &RawMenu) -> Result<MenuNode, MenuError> {
        if menu.buttons.is_empty() && menu.do_button.is_none() {
            return Err(MenuError::NoControls {
                state: name.to_string(),
            });
        }
        if !menu.buttons.is_empty() && menu.do_button.is_some() {
            return Err(MenuError::ButtonsConflictWithAutoTrigger {
                state: name.to_string(),
            });
        }
        if !has_any_reply(&menu.answer) {
            return Err(MenuError::EmptyReply {
                state: name.to_string(),
                depth: 1,
            });
        }

        let controls = menu
            .buttons
            .iter()
            .map(|raw| self.convert_control(raw, name, 1, false))
            .collect::<Result<Vec<_>, _>>()?;

        let auto_trigger = menu
            .do_button
            .as_deref()
            .map(|raw| self.convert_control(raw, name, 1, true))
            .transpose()?;

        Ok(MenuNode {
            replies: menu.answer.iter().map(convert_answer).collect(),
            controls,
            auto_trigger,
            qna_disabled: menu.qna_disable,
        })
    }

    fn convert_control(
        &self,
        raw: &RawControl,
        state: &str,
        depth: usize,
        allow_empty_text: bool,
    ) -> Result<Control, MenuError> {
        let raw = self.with_modifier_defaults(raw);
        let label = control_label(&raw);
        let at = |state: &str| (state.to_string(), label.clone(), depth);

        let mut modifiers = 0usize;
        if raw.back_button {
            modifiers += 1;
        }
        if raw.close_button {
            modifiers += 1;
        }
        if raw.redirect_button {
            modifiers += 1;
        }
        if raw.appoint_spec_button.map_or(false, |id| !id.is_nil()) {
            modifiers += 1;
        }
        if raw
            .appoint_random_spec_button
            .as_ref()
            .map_or(false, |set| !set.is_empty())
        {
            modifiers += 1;
        }
        if raw.reroute_button.map_or(false, |id| !id.is_nil()) {
            modifiers += 1;
        }
        if raw.exec_button.as_deref().map_or(false, |c| !c.is_empty()) {
            modifiers += 1;
        }
        if raw.save_to_var.is_some() {
            modifiers += 1;
        }
        if raw.ticket_button.is_some() {
            modifiers += 1;
        }
        if modifiers > 1 {
            let (state, control, depth) = at(state);
            return Err(MenuError::MultipleModifiers {
                state,
                control,
                depth,
            });
        }

        if raw.back_button && raw.goto.is_some() {
            let (state, control, depth) = at(state);
            return Err(MenuError::BackWithDestination {
                state,
                control,
                depth,
            });
        }

        if !allow_empty_text && raw.text.is_empty() {
            let (state, control, depth) = at(state);
            return Err(MenuError::EmptyControlText {
                state,
                control,
                depth,
            });
        }

        if let Some(target) = raw.goto.as_deref() {
            if target != CREATE_TICKET_PREV_STAGE && !self.names.contains(target) {
                let (state, control, depth) = at(state);
                return Err(MenuError::UnknownDestination {
                    target: target.to_string(),
                    state,
                    control,
                    depth,
                });
            }
        }

        let action = self.convert_action(&raw, state, depth, &label)?;

        if matches!(action, Action::Navigate) && raw.goto.is_none() {
            let (state, control, depth) = at(state);
            return Err(MenuError::MissingDestination {
                state,
                control,
                depth,
            });
        }

        Ok(Control {
            id: raw.id.clone(),
            text: raw.text.clone(),
            replies: raw.chat.iter().map(convert_answer).collect(),
            action,
            goto: raw.goto.clone(),
        })
    }

    fn convert_action(
        &self,
        raw: &RawControl,
        state: &str,
        depth: usize,
        label: &str,
    ) -> Result<Action, MenuError> {
        let at = || (state.to_string(), label.to_string(), depth);

        if raw.back_button {
            return Ok(Action::Back);
        }
        if raw.close_button {
            return Ok(Action::Close);
        }
        if raw.redirect_button {
            return Ok(Action::Redirect);
        }
        if let Some(id) = raw.appoint_spec_button.filter(|id| !id.is_nil()) {
            return Ok(Action::AppointSpecialist(id));
        }
        if let Some(set) = raw
            .appoint_random_spec_button
            .as_ref()
            .filter(|set| !set.is_empty())
        {
            return Ok(Action::AppointRandomFrom(set.clone()));
        }
        if let Some(line) = raw.reroute_button.filter(|id| !id.is_nil()) {
            return Ok(Action::RerouteLine(line));
        }
        if let Some(command) = raw.exec_button.as_deref().filter(|c| !c.is_empty()) {
            return Ok(Action::Exec(command.to_string()));
        }

        if let Some(capture) = &raw.save_to_var {
            if capture.var_name.is_empty() {
                let (state, control, depth) = at();
                return Err(MenuError::CaptureMissingVarName {
                    state,
                    control,
                    depth,
                });
            }
            if capture.var_name == PENDING_INPUT_VAR {
                let (state, control, depth) = at();
                return Err(MenuError::CaptureReservedVarName {
                    state,
                    control,
                    depth,
                });
            }
            let Some(continuation) = capture.do_button.as_deref() else {
                let (state, control, depth) = at();
                return Err(MenuError::CaptureMissingContinuation {
                    state,
                    control,
                    depth,
                });
            };
            if continuation.back_button {
                let (state, control, depth) = at();
                return Err(MenuError::CaptureBackContinuation {
                    state,
                    control,
                    depth,
                });
            }
            let continuation = self.convert_control(continuation, state, depth + 1, true)?;
            return Ok(Action::Capture(CaptureSpec {
                var_name: capture.var_name.clone(),
                send_text: capture.send_text.clone(),
                offer_options: capture.offer_options.clone(),
                continuation: Box::new(continuation),
            }));
        }

        if let Some(ticket) = &raw.ticket_button {
            let Some(channel_id) = ticket.channel_id.filter(|id| !id.is_nil()) else {
                let (state, control, depth) = at();
                return Err(MenuError::TicketMissingChannel {
                    state,
                    control,
                    depth,
                });
            };
            if ticket.ticket_info.is_empty() {
                let (state, control, depth) = at();
                return Err(MenuError::TicketMissingInfo {
                    state,
                    control,
                    depth,
                });
            }
            let Some(data) = &ticket.data else {
                let (state, control, depth) = at();
                return Err(MenuError::TicketMissingData {
                    state,
                    control,
                    depth,
                });
            };

            let fields = TicketFields {
                theme: self.convert_field(data.theme.as_ref(), "theme", false, state, depth, label)?,
                description: self.convert_field(
                    data.description.as_ref(),
                    "description",
                    false,
                    state,
                    depth,
                    label,
                )?,
                executor: self.convert_field(
                    data.executor.as_ref(),
                    "executor",
                    true,
                    state,
                    depth,
                    label,
                )?,
                service: self.convert_field(
                    data.service.as_ref(),
                    "service",
                    true,
                    state,
                    depth,
                    label,
                )?,
                service_type: self.convert_field(
                    data.service_type.as_ref(),
                    "type",
                    true,
                    state,
                    depth,
                    label,
                )?,
            };

            let goto = ticket.goto.clone().unwrap_or_else(|| FINAL.to_string());
            if goto != CREATE_TICKET_PREV_STAGE && !self.names.contains(&goto) {
                let (state, control, depth) = at();
                return Err(MenuError::UnknownDestination {
                    target: goto,
                    state,
                    control,
                    depth,
                });
            }

            return Ok(Action::Ticket(TicketSpec {
                channel_id,
                info_template: ticket.ticket_info.clone(),
                fields,
                goto,
            }));
        }

        Ok(Action::Navigate)
    }

    fn convert_field(
        &self,
        field: Option<&RawTicketField>,
        name: &'static str,
        default_must_be_id: bool,
        state: &str,
        depth: usize,
        label: &str,
    ) -> Result<FieldSpec, MenuError> {
        let Some(field) = field else {
            return Err(MenuError::TicketFieldMissing {
                field: name,
                state: state.to_string(),
                control: label.to_string(),
                depth,
            });
        };
        if field.text.is_empty() && field.default_value.is_none() {
            return Err(MenuError::TicketFieldEmpty {
                field: name,
                state: state.to_string(),
                control: label.to_string(),
                depth,
            });
        }
        if default_must_be_id {
            if let Some(value) = &field.default_value {
                if Uuid::parse_str(value).is_err() {
                    return Err(MenuError::TicketDefaultNotId {
                        field: name,
                        state: state.to_string(),
                        control: label.to_string(),
                        depth,
                    });
                }
            }
        }
        Ok(FieldSpec {
            prompt: field.text.clone(),
            default_value: field.default_value.clone(),
        })
    }

    /// Fill missing id/text/reply fragments from the document-wide
    /// template matching the control's modifier, if one is configured.
    fn with_modifier_defaults(&self, raw: &RawControl) -> RawControl {
        let doc = self.document;
        let template = if raw.save_to_var.is_some() {
            doc.save_to_var.as_ref()
        } else if raw.ticket_button.is_some() {
            doc.ticket_button.as_ref()
        } else if raw.close_button {
            doc.close_button.as_ref()
        } else if raw.redirect_button {
            doc.redirect_button.as_ref()
        } else if raw.back_button {
            doc.back_button.as_ref()
        } else if raw.appoint_spec_button.map_or(false, |id| !id.is_nil()) {
            doc.appoint_spec_button.as_ref()
        } else if raw
            .appoint_random_spec_button
            .as_ref()
            .map_or(false, |set| !set.is_empty())
        {
            doc.appoint_random_spec_button.as_ref()
        } else if raw.reroute_button.map_or(false, |id| !id.is_nil()) {
            doc.reroute_button.as_ref()
        } else if raw.exec_button.as_deref().map_or(false, |c| !c.is_empty()) {
            doc.exec_button.as_ref()
        } else {
            None
        };

        let Some(template) = template else {
            return raw.clone();
        };

        let mut merged = raw.clone();
        if merged.id.is_empty() {
            merged.id = template.id.clone();
        }
        if merged.text.is_empty() {
            merged.text = template.text.clone();
        }
        if merged.chat.is_empty() {
            merged.chat = template.chat.clone();
        }
        merged
    }
}

fn has_any_reply(answers: &[RawAnswer]) -> bool {
    answers.iter().any(|a| !a.is_empty())
}

fn convert_answer(answer: &RawAnswer) -> ReplyFragment {
    ReplyFragment {
        text: answer.chat.clone().filter(|t| !t.is_empty()),
        file: answer.file.clone().filter(|f| !f.is_empty()),
        caption: answer.file_text.clone(),
    }
}

fn resolve_error_texts(configured: &ErrorMessages) -> ErrorTexts {
    let defaults = ErrorTexts::default();
    let pick = |value: &str, fallback: String| {
        if value.is_empty() {
            fallback
        } else {
            value.to_string()
        }
    };
    ErrorTexts {
        command_unknown: pick(&configured.command_unknown, defaults.command_unknown),
        button_processing: pick(&configured.button_processing, defaults.button_processing),
        failed_send_file: pick(&configured.failed_send_file, defaults.failed_send_file),
        specialist_not_available: pick(
            &configured.specialist_not_available,
            defaults.specialist_not_available,
        ),
        specialists_not_available: pick(
            &configured.specialists_not_available,
            defaults.specialists_not_available,
        ),
        line_not_available: pick(&configured.line_not_available, defaults.line_not_available),
        step_cannot_be_skipped: pick(
            &configured.step_cannot_be_skipped,
            defaults.step_cannot_be_skipped,
        ),
        received_incorrect_value: pick(
            &configured.received_incorrect_value,
            defaults.received_incorrect_value,
        ),
        expected_button_press: pick(
            &configured.expected_button_press,
            defaults.expected_button_press,
        ),
    }
}

fn raw_button(id: &str, text: &str) -> RawControl {
    RawControl {
        id: id.to_string(),
        text: text.to_string(),
        ..Default::default()
    }
}

fn default_final_menu() -> RawMenu {
    let mut yes = raw_button("1", "Yes");
    yes.goto = Some(START.to_string());

    let mut no = raw_button("2", "No");
    no.chat = vec![RawAnswer {
        chat: Some("Thank you for reaching out!".to_string()),
        ..Default::default()
    }];
    no.close_button = true;

    let mut escalate = raw_button("0", "Connect me with a specialist");
    escalate.redirect_button = true;

    RawMenu {
        answer: vec![RawAnswer {
            chat: Some("Is there anything else I can help you with?".to_string()),
            ..Default::default()
        }],
        buttons: vec![yes, no, escalate],
        ..Default::default()
    }
}

fn default_fail_qna_menu() -> RawMenu {
    let mut retry = raw_button("1", "Try again");
    retry.back_button = true;

    let mut close = raw_button("2", "Close the request");
    close.chat = vec![RawAnswer {
        chat: Some("Thank you for reaching out!".to_string()),
        ..Default::default()
    }];
    close.close_button = true;

    let mut escalate = raw_button("0", "Connect me with a specialist");
    escalate.redirect_button = true;

    RawMenu {
        answer: vec![RawAnswer {
            chat: Some(
                "I didn't understand that.\n\nTry again, or connect with a specialist?"
                    .to_string(),
            ),
            ..Default::default()
        }],
        buttons: vec![retry, close, escalate],
        ..Default::default()
    }
}

fn default_wait_send_menu() -> RawMenu {
    let mut cancel = raw_button("0", "Cancel");
    cancel.back_button = true;

    RawMenu {
        answer: vec![RawAnswer {
            chat: Some("Enter your value".to_string()),
            ..Default::default()
        }],
        buttons: vec![cancel],
        ..Default::default()
    }
}

/// Button table resolved against at the wizard state. The reply text is
/// never rendered; the wizard sends its own prompts.
fn wizard_button_table() -> RawMenu {
    let mut next = raw_button("1", "Next");
    next.goto = Some(CREATE_TICKET.to_string());

    let mut back = raw_button("2", "Back");
    back.goto = Some(CREATE_TICKET_PREV_STAGE.to_string());

    let mut confirm = raw_button("1", "Confirm");
    confirm.goto = Some(CREATE_TICKET.to_string());

    let mut cancel = raw_button("0", "Cancel");
    cancel.back_button = true;

    RawMenu {
        answer: vec![RawAnswer {
            chat: Some("Select an action".to_string()),
            ..Default::default()
        }],
        buttons: vec![next, back, confirm, cancel],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_yaml(input: &str) -> Result<MenuGraph, MenuError> {
        compile(&MenuDocument::from_yaml(input).unwrap())
    }

    const MINIMAL: &str = r#"
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
"#;

    #[test]
    fn compiles_minimal_document() {
        let graph = compile_yaml(MINIMAL).unwrap();
        assert!(graph.contains(START));
        assert!(graph.contains("about"));
        // Reserved states are synthesized.
        assert!(graph.contains(FINAL));
        assert!(graph.contains(WAIT_SEND));
        assert!(graph.contains(CREATE_TICKET));
        // QNA is off, so no fail menu.
        assert!(!graph.contains(FAIL_QNA));
    }

    #[test]
    fn missing_start_menu_fails() {
        let err = compile_yaml(
            r#"
menus:
  lobby:
    answer:
      - chat: "hi"
    buttons:
      - text: "x"
        goto: lobby
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::MissingStartMenu));
    }

    #[test]
    fn dangling_goto_fails_with_named_error() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Go"
        goto: nowhere
"#,
        )
        .unwrap_err();
        match err {
            MenuError::UnknownDestination { target, state, .. } => {
                assert_eq!(target, "nowhere");
                assert_eq!(state, "start");
            }
            other => panic!("unexpected error: {other}"),
        }

        // Adding the target makes the same document compile.
        let graph = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Go"
        goto: nowhere
  nowhere:
    answer:
      - chat: "found"
    buttons:
      - text: "Back"
        back_button: true
"#,
        )
        .unwrap();
        assert!(graph.contains("nowhere"));
    }

    #[test]
    fn two_modifiers_fail() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Both"
        close_button: true
        redirect_button: true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::MultipleModifiers { .. }));
    }

    #[test]
    fn back_with_goto_fails() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Back"
        back_button: true
        goto: start
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::BackWithDestination { .. }));
    }

    #[test]
    fn empty_reply_fails() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: ""
    buttons:
      - id: "1"
        text: "Go"
        goto: start
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::EmptyReply { .. }));
    }

    #[test]
    fn empty_button_text_fails() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        goto: start
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::EmptyControlText { .. }));
    }

    #[test]
    fn three_level_nesting_flattens_to_three_new_states() {
        let graph = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "level 0"
    buttons:
      - text: "Down"
        menu:
          id: lvl1
          answer:
            - chat: "level 1"
          buttons:
            - text: "Down"
              menu:
                id: lvl2
                answer:
                  - chat: "level 2"
                buttons:
                  - text: "Down"
                    menu:
                      id: lvl3
                      answer:
                        - chat: "level 3"
                      buttons:
                        - text: "Back"
                          back_button: true
"#,
        )
        .unwrap();

        for name in ["lvl1", "lvl2", "lvl3"] {
            assert!(graph.contains(name), "missing flattened state {name}");
        }
        // Each enclosing control points at its flattened submenu.
        let start = graph.node(START).unwrap();
        assert_eq!(start.controls[0].goto.as_deref(), Some("lvl1"));
        let lvl1 = graph.node("lvl1").unwrap();
        assert_eq!(lvl1.controls[0].goto.as_deref(), Some("lvl2"));
    }

    #[test]
    fn duplicate_nested_id_fails() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - text: "Down"
        menu:
          id: start
          answer:
            - chat: "inner"
          buttons:
            - text: "Back"
              back_button: true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MenuError::DuplicateMenuId { .. }));
    }

    #[test]
    fn control_without_continuation_falls_through_to_final() {
        let graph = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Just text"
        chat:
          - chat: "ok"
"#,
        )
        .unwrap();
        let control = &graph.node(START).unwrap().controls[0];
        assert_eq!(control.goto.as_deref(), Some(FINAL));
    }

    #[test]
    fn capture_continuation_gets_implicit_final() {
        let graph = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Note"
        save_to_var:
          var_name: note
          do_button:
            chat:
              - chat: "saved"
"#,
        )
        .unwrap();
        let control = &graph.node(START).unwrap().controls[0];
        match &control.action {
            Action::Capture(spec) => {
                assert_eq!(spec.var_name, "note");
                assert_eq!(spec.continuation.goto.as_deref(), Some(FINAL));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn capture_into_reserved_variable_fails() {
        let err = compile_yaml(&format!(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Note"
        save_to_var:
          var_name: {PENDING_INPUT_VAR}
          do_button:
            chat:
              - chat: "saved"
"#
        ))
        .unwrap_err();
        assert!(matches!(err, MenuError::CaptureReservedVarName { .. }));
    }

    #[test]
    fn modifier_defaults_fill_missing_text() {
        let graph = compile_yaml(
            r#"
close_button:
  id: "9"
  text: "Close the request"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - close_button: true
"#,
        )
        .unwrap();
        let control = &graph.node(START).unwrap().controls[0];
        assert_eq!(control.text, "Close the request");
        assert_eq!(control.id, "9");
        assert!(matches!(control.action, Action::Close));
    }

    #[test]
    fn ticket_button_requires_all_fields() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "File"
        ticket_button:
          channel_id: bb296731-3d58-4c4a-8227-315bdc2bf3ff
          ticket_info: "{{ticket.theme}}"
          data:
            theme:
              text: "Subject?"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MenuError::TicketFieldMissing {
                field: "description",
                ..
            }
        ));
    }

    #[test]
    fn ticket_choice_default_must_be_id() {
        let err = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "File"
        ticket_button:
          channel_id: bb296731-3d58-4c4a-8227-315bdc2bf3ff
          ticket_info: "{{ticket.theme}}"
          data:
            theme:
              text: "Subject?"
            description:
              text: "Details?"
            executor:
              value: "not-an-id"
            service:
              text: "Which service?"
            type:
              text: "Which kind?"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MenuError::TicketDefaultNotId {
                field: "executor",
                ..
            }
        ));
    }

    #[test]
    fn fail_qna_synthesized_only_with_qna_enabled() {
        let graph = compile_yaml(&format!("use_qna:\n  enabled: true\n{MINIMAL}")).unwrap();
        assert!(graph.contains(FAIL_QNA));
        assert!(graph.qna_allowed(START));
    }

    #[test]
    fn greeting_defaults_when_unset() {
        let graph = compile_yaml(MINIMAL).unwrap();
        assert_eq!(graph.greeting_message(), "Hello.");
        assert!(!graph.first_greeting());
    }

    #[test]
    fn error_texts_default_and_override() {
        let graph = compile_yaml(&format!(
            "error_messages:\n  command_unknown: \"Try the keyboard\"\n{MINIMAL}"
        ))
        .unwrap();
        assert_eq!(graph.errors().command_unknown, "Try the keyboard");
        assert_eq!(
            graph.errors().step_cannot_be_skipped,
            ErrorTexts::default().step_cannot_be_skipped
        );
    }

    #[test]
    fn final_menu_from_document_is_kept() {
        let graph = compile_yaml(
            r#"
menus:
  start:
    answer:
      - chat: "hi"
    buttons:
      - id: "1"
        text: "Done"
  final_menu:
    answer:
      - chat: "custom goodbye"
    buttons:
      - id: "1"
        text: "Start over"
        goto: start
"#,
        )
        .unwrap();
        let node = graph.node(FINAL).unwrap();
        assert_eq!(node.replies[0].text.as_deref(), Some("custom goodbye"));
        assert_eq!(node.controls.len(), 1);
    }
}
