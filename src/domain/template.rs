//! Template substitution for reply text, command arguments and wizard
//! defaults.
//!
//! Templates see the session's user profile (`{{user.*}}`), the variable
//! bag (`{{var.*}}`) and the ticket draft (`{{ticket.*}}`). A render
//! failure aborts the current action and routes through the generic error
//! responder.

use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde_json::json;
use thiserror::Error;

use super::session::SessionState;

/// Render failure; treated as unrecoverable for the current action.
#[derive(Debug, Error)]
#[error("template substitution failed: {0}")]
pub struct TemplateError(String);

static ENGINE: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut engine = Handlebars::new();
    // Fail on unknown paths instead of rendering them away silently.
    engine.set_strict_mode(true);
    engine
});

/// Substitute session data into `text`. Text without template markers is
/// returned untouched without engaging the engine.
pub fn render(state: &SessionState, text: &str) -> Result<String, TemplateError> {
    if !text.contains("{{") || !text.contains("}}") {
        return Ok(text.to_string());
    }

    let choice = |item: &Option<crate::domain::session::ChosenItem>| match item {
        Some(item) => json!({ "id": item.id.to_string(), "name": item.name }),
        None => json!({ "id": "", "name": "" }),
    };

    let context = json!({
        "user": {
            "user_id": state.user.user_id.map(|id| id.to_string()).unwrap_or_default(),
            "name": state.user.name,
            "surname": state.user.surname,
            "patronymic": state.user.patronymic,
            "email": state.user.email.clone().unwrap_or_default(),
        },
        "var": state.vars,
        "ticket": {
            "channel_id": state.ticket.channel_id.map(|id| id.to_string()).unwrap_or_default(),
            "theme": state.ticket.theme,
            "description": state.ticket.description,
            "executor": choice(&state.ticket.executor),
            "service": choice(&state.ticket.service),
            "type": choice(&state.ticket.service_type),
        },
    });

    ENGINE
        .render_template(text, &context)
        .map_err(|err| TemplateError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{ChosenItem, SessionState};
    use uuid::Uuid;

    fn state_with_data() -> SessionState {
        let mut state = SessionState::new();
        state.user.name = "Anna".to_string();
        state.user.surname = "Petrova".to_string();
        state.set_var("city", "Kazan");
        state.ticket.theme = "printer".to_string();
        state.ticket.executor = Some(ChosenItem::new(Uuid::nil(), "Ivanov Ivan"));
        state
    }

    #[test]
    fn plain_text_passes_through() {
        let state = SessionState::new();
        assert_eq!(render(&state, "no markers").unwrap(), "no markers");
        // A lone opening brace pair is not a template.
        assert_eq!(render(&state, "just {{ this").unwrap(), "just {{ this");
    }

    #[test]
    fn substitutes_user_var_and_ticket() {
        let state = state_with_data();
        let out = render(
            &state,
            "{{user.surname}} {{user.name}} from {{var.city}}: {{ticket.theme}} -> {{ticket.executor.name}}",
        )
        .unwrap();
        assert_eq!(out, "Petrova Anna from Kazan: printer -> Ivanov Ivan");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let state = SessionState::new();
        assert!(render(&state, "{{var.unset}}").is_err());
    }

    #[test]
    fn unchosen_items_render_empty() {
        let state = state_with_data();
        let out = render(&state, "[{{ticket.service.name}}]").unwrap();
        assert_eq!(out, "[]");
    }
}
