//! Ticket-creation wizard.
//!
//! A nested sequential machine over Theme → Description → Executor →
//! Service → ServiceType → Confirmation. Fields with configured defaults
//! are filled and skipped; backward navigation walks an explicit
//! predecessor table and skips the same defaulted fields.

use tracing::warn;
use uuid::Uuid;

use crate::domain::menu::{
    Action, Keyboard, MenuGraph, TicketSpec, CREATE_TICKET, CREATE_TICKET_PREV_STAGE,
};
use crate::domain::session::{ChosenItem, SessionKey, SessionState, TicketField};
use crate::domain::template;
use crate::ports::TicketMetadata;

use super::{Dispatcher, StepResult};

fn row_next(keyboard: &mut Keyboard) {
    keyboard.push_row("1", "Next");
}

fn row_back(keyboard: &mut Keyboard) {
    keyboard.push_row("2", "Back");
}

fn row_confirm(keyboard: &mut Keyboard) {
    keyboard.push_row("1", "Confirm");
}

fn row_cancel(keyboard: &mut Keyboard) {
    keyboard.push_row("0", "Cancel");
}

impl Dispatcher {
    /// One inbound message while the wizard is active.
    pub(super) async fn handle_wizard(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        event: &super::InboundEvent,
        text: &str,
    ) -> StepResult {
        let pressed = graph.find_control(CREATE_TICKET, text).cloned();

        // The control that started the wizard carries the field specs.
        let Some(spec) = state
            .continuation
            .as_ref()
            .and_then(|control| control.ticket_spec())
            .cloned()
        else {
            warn!("wizard input without a stored ticket control");
            return Ok(self.final_send(graph, key, state, None).await);
        };

        // Cancel leaves through the configured destination, dropping the
        // draft.
        if matches!(pressed.as_ref().map(|c| &c.action), Some(Action::Back)) {
            let target = spec.goto.clone();
            self.sessions.clear_volatile(key, state).await?;
            return self.send_menu(graph, key, state, &target).await;
        }

        let Some(field) = state.pending_input().and_then(TicketField::parse) else {
            warn!("wizard input without a pending field");
            return Ok(self.final_send(graph, key, state, None).await);
        };

        let pressed_goto = pressed.as_ref().and_then(|c| c.goto.as_deref());
        if pressed_goto == Some(CREATE_TICKET_PREV_STAGE) {
            return self.prev_stage(graph, key, state, &spec, field).await;
        }
        // "Next" at a text field, "Confirm" at the review step.
        let advance_pressed = pressed_goto == Some(CREATE_TICKET);

        match field {
            TicketField::Theme | TicketField::Description => {
                // A skip stores the empty string.
                let value = if advance_pressed {
                    String::new()
                } else {
                    event.text.clone()
                };
                self.sessions
                    .change_ticket(key, state, move |draft| match field {
                        TicketField::Theme => draft.theme = value,
                        _ => draft.description = value,
                    })
                    .await?;

                let next = match field {
                    TicketField::Theme => TicketField::Description,
                    _ => TicketField::Executor,
                };
                self.advance_stage(graph, key, state, &spec, next).await
            }

            TicketField::Executor | TicketField::Service | TicketField::ServiceType => {
                if advance_pressed {
                    if let Err(err) = self
                        .gateway
                        .send_text(key.user_id, &graph.errors().step_cannot_be_skipped, None)
                        .await
                    {
                        warn!(error = %err, "skip notice failed");
                    }
                    return Ok(CREATE_TICKET.to_string());
                }
                self.fill_choice_field(graph, key, state, &spec, field, &event.text)
                    .await
            }

            TicketField::Confirmation => {
                if advance_pressed {
                    return self.submit_ticket(graph, key, state, &spec).await;
                }
                if let Err(err) = self
                    .gateway
                    .send_text(key.user_id, &graph.errors().expected_button_press, None)
                    .await
                {
                    warn!(error = %err, "confirmation notice failed");
                }
                Ok(CREATE_TICKET.to_string())
            }
        }
    }

    /// Match free text against the field's backing choice list. The match
    /// is exact and case-sensitive; anything else re-prompts.
    async fn fill_choice_field(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        spec: &TicketSpec,
        field: TicketField,
        input: &str,
    ) -> StepResult {
        let matched: Option<ChosenItem> = match field {
            TicketField::Executor => {
                let specialists = match self.gateway.specialists_on_line().await {
                    Ok(specialists) => specialists,
                    Err(err) => {
                        warn!(error = %err, "specialist list fetch failed");
                        return Ok(self.final_send(graph, key, state, None).await);
                    }
                };
                specialists
                    .iter()
                    .find(|s| s.full_name() == input)
                    .map(|s| ChosenItem::new(s.user_id, input))
            }
            TicketField::Service => {
                let metadata = match self.ticket_metadata(state).await {
                    Ok(metadata) => metadata,
                    Err(()) => return Ok(self.final_send(graph, key, state, None).await),
                };
                metadata
                    .kinds_for_line(self.line_id)
                    .into_iter()
                    .find(|kind| kind.name == input)
                    .map(|kind| ChosenItem::new(kind.id, input))
            }
            _ => {
                let Some(service) = state.ticket.service.clone() else {
                    warn!("service type requested before service");
                    return Ok(self.final_send(graph, key, state, None).await);
                };
                let metadata = match self.ticket_metadata(state).await {
                    Ok(metadata) => metadata,
                    Err(()) => return Ok(self.final_send(graph, key, state, None).await),
                };
                metadata
                    .types_for_kind(service.id)
                    .into_iter()
                    .find(|t| t.name == input)
                    .map(|t| ChosenItem::new(t.id, input))
            }
        };

        let Some(chosen) = matched else {
            if let Err(err) = self
                .gateway
                .send_text(key.user_id, &graph.errors().received_incorrect_value, None)
                .await
            {
                warn!(error = %err, "incorrect-value notice failed");
            }
            return Ok(CREATE_TICKET.to_string());
        };

        self.sessions
            .change_ticket(key, state, move |draft| match field {
                TicketField::Executor => draft.executor = Some(chosen),
                TicketField::Service => draft.service = Some(chosen),
                _ => draft.service_type = Some(chosen),
            })
            .await?;

        let next = match field {
            TicketField::Executor => TicketField::Service,
            TicketField::Service => TicketField::ServiceType,
            _ => TicketField::Confirmation,
        };
        self.advance_stage(graph, key, state, spec, next).await
    }

    /// Move the wizard forward from `start`: defaulted fields are filled
    /// from their backing source and skipped; the first field needing
    /// input renders its prompt and keyboard and the wizard waits.
    pub(super) async fn advance_stage(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        spec: &TicketSpec,
        start: TicketField,
    ) -> StepResult {
        let user = key.user_id;
        let mut field = start;
        let mut keyboard = Keyboard::new();
        let mut metadata: Option<TicketMetadata> = None;

        let prompt = loop {
            match field {
                TicketField::Theme | TicketField::Description => {
                    let field_spec = if field == TicketField::Theme {
                        &spec.fields.theme
                    } else {
                        &spec.fields.description
                    };
                    if let Some(default) = &field_spec.default_value {
                        let value = match template::render(state, default) {
                            Ok(value) => value,
                            Err(err) => {
                                warn!(error = %err, "default value rendering failed");
                                return Ok(self.final_send(graph, key, state, None).await);
                            }
                        };
                        let target = field;
                        self.sessions
                            .change_ticket(key, state, move |draft| {
                                if target == TicketField::Theme {
                                    draft.theme = value;
                                } else {
                                    draft.description = value;
                                }
                            })
                            .await?;
                        field = if field == TicketField::Theme {
                            TicketField::Description
                        } else {
                            TicketField::Executor
                        };
                        continue;
                    }
                    row_next(&mut keyboard);
                    row_back(&mut keyboard);
                    row_cancel(&mut keyboard);
                    break field_spec.prompt.clone();
                }

                TicketField::Executor => {
                    if let Some(default) = &spec.fields.executor.default_value {
                        let Ok(id) = Uuid::parse_str(default) else {
                            warn!("executor default is not an id");
                            return Ok(self.final_send(graph, key, state, None).await);
                        };
                        let profile = match self.gateway.specialist_profile(id).await {
                            Ok(profile) => profile,
                            Err(err) => {
                                warn!(error = %err, "default executor lookup failed");
                                return Ok(self.final_send(graph, key, state, None).await);
                            }
                        };
                        let chosen = ChosenItem::new(profile.user_id, profile.full_name());
                        self.sessions
                            .change_ticket(key, state, move |draft| draft.executor = Some(chosen))
                            .await?;
                        field = TicketField::Service;
                        continue;
                    }
                    let specialists = match self.gateway.specialists_on_line().await {
                        Ok(specialists) => specialists,
                        Err(err) => {
                            warn!(error = %err, "specialist list fetch failed");
                            return Ok(self.final_send(graph, key, state, None).await);
                        }
                    };
                    for specialist in &specialists {
                        keyboard.push_row("", specialist.full_name());
                    }
                    row_next(&mut keyboard);
                    row_back(&mut keyboard);
                    row_cancel(&mut keyboard);
                    break spec.fields.executor.prompt.clone();
                }

                TicketField::Service => {
                    let data = match self.cached_metadata(&mut metadata, state).await {
                        Ok(data) => data,
                        Err(()) => return Ok(self.final_send(graph, key, state, None).await),
                    };
                    if let Some(default) = &spec.fields.service.default_value {
                        let found = data
                            .kinds_for_line(self.line_id)
                            .into_iter()
                            .find(|kind| kind.id.to_string() == *default)
                            .map(|kind| ChosenItem::new(kind.id, kind.name.clone()));
                        let Some(chosen) = found else {
                            warn!("default service is not available on this line");
                            return Ok(self.final_send(graph, key, state, None).await);
                        };
                        self.sessions
                            .change_ticket(key, state, move |draft| draft.service = Some(chosen))
                            .await?;
                        field = TicketField::ServiceType;
                        continue;
                    }
                    for kind in data.kinds_for_line(self.line_id) {
                        keyboard.push_row("", kind.name.clone());
                    }
                    row_next(&mut keyboard);
                    row_back(&mut keyboard);
                    row_cancel(&mut keyboard);
                    break spec.fields.service.prompt.clone();
                }

                TicketField::ServiceType => {
                    let Some(service) = state.ticket.service.clone() else {
                        warn!("service type stage reached before service");
                        return Ok(self.final_send(graph, key, state, None).await);
                    };
                    let data = match self.cached_metadata(&mut metadata, state).await {
                        Ok(data) => data,
                        Err(()) => return Ok(self.final_send(graph, key, state, None).await),
                    };
                    if let Some(default) = &spec.fields.service_type.default_value {
                        let found = data
                            .types_for_kind(service.id)
                            .into_iter()
                            .find(|t| t.id.to_string() == *default)
                            .map(|t| ChosenItem::new(t.id, t.name.clone()));
                        let Some(chosen) = found else {
                            warn!("default type does not apply to the chosen service");
                            return Ok(self.final_send(graph, key, state, None).await);
                        };
                        self.sessions
                            .change_ticket(key, state, move |draft| {
                                draft.service_type = Some(chosen)
                            })
                            .await?;
                        field = TicketField::Confirmation;
                        continue;
                    }
                    for t in data.types_for_kind(service.id) {
                        keyboard.push_row("", t.name.clone());
                    }
                    row_next(&mut keyboard);
                    row_back(&mut keyboard);
                    row_cancel(&mut keyboard);
                    break spec.fields.service_type.prompt.clone();
                }

                TicketField::Confirmation => {
                    row_confirm(&mut keyboard);
                    row_back(&mut keyboard);
                    row_cancel(&mut keyboard);
                    break spec.info_template.clone();
                }
            }
        };

        let rendered = match template::render(state, &prompt) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(error = %err, "wizard prompt rendering failed");
                return Ok(self.final_send(graph, key, state, None).await);
            }
        };

        self.sessions
            .set_pending_input(key, state, field.key())
            .await?;

        if let Err(err) = self.gateway.send_text(user, &rendered, Some(&keyboard)).await {
            warn!(error = %err, "wizard prompt send failed");
        }
        Ok(CREATE_TICKET.to_string())
    }

    /// Walk the field order backward. A field with a configured default
    /// is skipped for re-entry and the walk continues; stepping before
    /// Theme leaves the wizard and restores the pre-entry state.
    pub(super) async fn prev_stage(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        spec: &TicketSpec,
        current: TicketField,
    ) -> StepResult {
        let stages = [
            (
                TicketField::Confirmation,
                TicketField::ServiceType,
                spec.fields.service_type.default_value.as_ref(),
            ),
            (
                TicketField::ServiceType,
                TicketField::Service,
                spec.fields.service.default_value.as_ref(),
            ),
            (
                TicketField::Service,
                TicketField::Executor,
                spec.fields.executor.default_value.as_ref(),
            ),
            (
                TicketField::Executor,
                TicketField::Description,
                spec.fields.description.default_value.as_ref(),
            ),
            (
                TicketField::Description,
                TicketField::Theme,
                spec.fields.theme.default_value.as_ref(),
            ),
        ];

        let mut current = current;
        for (from, to, default) in stages {
            if current == from {
                current = to;
                if default.is_none() {
                    return self.advance_stage(graph, key, state, spec, current).await;
                }
            }
        }

        // Every earlier field was defaulted: leave the wizard entirely.
        if current == TicketField::Theme {
            let target = state.previous_state.clone();
            self.sessions.clear_volatile(key, state).await?;
            return self.send_menu(graph, key, state, &target).await;
        }

        warn!(stage = ?current, "no backward destination from wizard stage");
        Ok(self.final_send(graph, key, state, None).await)
    }

    /// Confirmed: submit under the deadline, wait (best effort) for the
    /// record to become visible, then leave through the continuation.
    async fn submit_ticket(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        spec: &TicketSpec,
    ) -> StepResult {
        let user = key.user_id;

        if let Err(err) = self.gateway.drop_keyboard(user).await {
            warn!(error = %err, "keyboard drop failed");
            return Ok(self.final_send(graph, key, state, None).await);
        }
        if let Err(err) = self
            .gateway
            .send_text(user, "Registering your request, one moment...", None)
            .await
        {
            warn!(error = %err, "progress notice failed");
        }

        let submitted = tokio::time::timeout(
            self.settings.submit_deadline,
            self.ticketing.create_ticket(user, self.line_id, &state.ticket),
        )
        .await;

        let ticket_id = match submitted {
            Ok(Ok(id)) => id,
            Ok(Err(err)) => {
                warn!(error = %err, "ticket submission failed");
                return Ok(self.final_send(graph, key, state, None).await);
            }
            Err(_) => {
                warn!("ticket submission deadline exceeded");
                return Ok(self.final_send(graph, key, state, None).await);
            }
        };

        // Eventual-visibility wait; giving up is not an error.
        for _ in 0..self.settings.poll_attempts {
            if !self.settings.poll_interval.is_zero() {
                tokio::time::sleep(self.settings.poll_interval).await;
            }
            if self.ticketing.get_ticket(ticket_id).await.is_ok() {
                break;
            }
        }

        self.sessions.clear_volatile(key, state).await?;
        self.send_menu(graph, key, state, &spec.goto).await
    }

    /// Metadata scoped to the session's counterpart owner.
    async fn ticket_metadata(&self, state: &SessionState) -> Result<TicketMetadata, ()> {
        let counterpart = state.user.counterpart_owner_id.unwrap_or(Uuid::nil());
        self.ticketing.metadata(counterpart).await.map_err(|err| {
            warn!(error = %err, "ticket metadata fetch failed");
        })
    }

    /// Fetch metadata once per advance chain.
    async fn cached_metadata<'a>(
        &self,
        cache: &'a mut Option<TicketMetadata>,
        state: &SessionState,
    ) -> Result<&'a TicketMetadata, ()> {
        if cache.is_none() {
            *cache = Some(self.ticket_metadata(state).await?);
        }
        match cache {
            Some(data) => Ok(data),
            None => Err(()),
        }
    }
}
