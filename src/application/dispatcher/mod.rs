//! Dialog dispatcher.
//!
//! Consumes one inbound event plus the session snapshot, resolves the
//! pressed control, executes its single action, renders the reply and
//! computes the next state. Recoverable failures route through the
//! generic error responder, which always leaves the user on the terminal
//! menu rather than an error page.

mod wizard;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{BotConfig, TicketingConfig};
use crate::domain::menu::{
    Action, Control, Keyboard, MenuGraph, MenuRegistry, CREATE_TICKET, FAIL_QNA, FINAL, GREETINGS,
    START, WAIT_SEND,
};
use crate::domain::session::{SessionKey, SessionState, TicketField};
use crate::domain::{shellwords, template};
use crate::ports::{
    CommandRunner, KnowledgeBase, MessageGateway, SessionStore, SessionStoreError, TicketingSystem,
};

use super::event::{EventKind, InboundEvent};
use super::locks::SessionLocks;
use super::renderer::Renderer;
use super::sessions::SessionService;

/// Failure that prevented the dispatch cycle from completing at all.
/// Anything user-recoverable is handled inside the cycle instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

type StepResult = Result<String, DispatchError>;

/// Timing and path knobs for one dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub files_dir: PathBuf,
    pub reply_pacing: Duration,
    /// Pause between the one-time greeting and the start menu.
    pub greeting_pause: Duration,
    pub exec_timeout: Duration,
    pub submit_deadline: Duration,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl DispatcherSettings {
    pub fn new(bot: &BotConfig, ticketing: &TicketingConfig) -> Self {
        Self {
            files_dir: bot.files_dir.clone(),
            reply_pacing: bot.reply_pacing(),
            greeting_pause: Duration::from_secs(1),
            exec_timeout: bot.exec_timeout(),
            submit_deadline: ticketing.submit_deadline(),
            poll_attempts: ticketing.poll_attempts,
            poll_interval: ticketing.poll_interval(),
        }
    }

    /// Settings with all delays zeroed, for tests.
    pub fn immediate(files_dir: PathBuf) -> Self {
        Self {
            files_dir,
            reply_pacing: Duration::ZERO,
            greeting_pause: Duration::ZERO,
            exec_timeout: Duration::from_secs(5),
            submit_deadline: Duration::from_secs(5),
            poll_attempts: 0,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Per-line dialog dispatcher.
pub struct Dispatcher {
    line_id: Uuid,
    menus: Arc<MenuRegistry>,
    sessions: SessionService,
    gateway: Arc<dyn MessageGateway>,
    qna: Arc<dyn KnowledgeBase>,
    ticketing: Arc<dyn TicketingSystem>,
    runner: Arc<dyn CommandRunner>,
    renderer: Renderer,
    locks: SessionLocks,
    settings: DispatcherSettings,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        line_id: Uuid,
        menus: Arc<MenuRegistry>,
        store: Arc<dyn SessionStore>,
        gateway: Arc<dyn MessageGateway>,
        qna: Arc<dyn KnowledgeBase>,
        ticketing: Arc<dyn TicketingSystem>,
        runner: Arc<dyn CommandRunner>,
        settings: DispatcherSettings,
    ) -> Self {
        let sessions = SessionService::new(store, gateway.clone());
        let renderer = Renderer::new(
            gateway.clone(),
            settings.files_dir.clone(),
            settings.reply_pacing,
        );
        Self {
            line_id,
            menus,
            sessions,
            gateway,
            qna,
            ticketing,
            runner,
            renderer,
            locks: SessionLocks::new(),
            settings,
        }
    }

    pub fn line_id(&self) -> Uuid {
        self.line_id
    }

    /// Process one inbound event end to end. The session's lock is held
    /// for the whole cycle, so same-session events serialize.
    pub async fn process(&self, event: InboundEvent) -> Result<(), DispatchError> {
        let key = SessionKey::new(event.user_id, event.line_id);
        let span = info_span!(
            "dispatch",
            user = %event.user_id,
            line = %event.line_id,
            kind = ?event.kind
        );

        async {
            let _guard = self.locks.acquire(key).await;
            let graph = self.menus.snapshot().await;
            let mut state = self.sessions.load_or_create(&key).await?;

            let next = self.handle_event(&graph, &key, &mut state, &event).await?;
            self.sessions.change_state(&key, &mut state, &next).await?;
            debug!(next = %next, "dispatch complete");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn handle_event(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        event: &InboundEvent,
    ) -> StepResult {
        match event.kind {
            EventKind::TreatmentStartByUser => {
                // Idempotent when the conversation is already underway.
                if state.current_state == START {
                    return Ok(START.to_string());
                }
                self.sessions.history_clear(key, state).await?;
                Ok(GREETINGS.to_string())
            }

            EventKind::CallStartTreatment
            | EventKind::CallStartNoTreatment
            | EventKind::TreatmentStartBySpecialist
            | EventKind::TreatmentClose
            | EventKind::TreatmentCloseActive => {
                if let Err(err) = self.gateway.start_treatment(event.user_id).await {
                    warn!(error = %err, "start treatment failed");
                }
                self.sessions.history_clear(key, state).await?;
                Ok(GREETINGS.to_string())
            }

            EventKind::NoFreeSpecialists => {
                if let Err(err) = self.gateway.reroute_treatment(event.user_id).await {
                    warn!(error = %err, "treatment reroute failed");
                }
                self.sessions.history_clear(key, state).await?;
                Ok(GREETINGS.to_string())
            }

            EventKind::TreatmentToBot | EventKind::LineRerouteOtherLine => {
                debug!(hint = ?event.redirect_hint, "lifecycle event acknowledged");
                Ok(GREETINGS.to_string())
            }

            EventKind::Text | EventKind::File => {
                let text = event.text.trim().to_lowercase();
                match state.current_state.clone().as_str() {
                    GREETINGS => self.handle_greetings(graph, key, state, event, &text).await,
                    CREATE_TICKET => self.handle_wizard(graph, key, state, event, &text).await,
                    WAIT_SEND => self.handle_wait_send(graph, key, state, event, &text).await,
                    current => {
                        self.handle_menu_state(graph, key, state, event, current, &text)
                            .await
                    }
                }
            }
        }
    }

    /// First contact and everything typed before the start menu. The
    /// literal "menu" keyword always renders the start menu; other text
    /// tries the knowledge base first when it is enabled for `start`.
    async fn handle_greetings(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        event: &InboundEvent,
        text: &str,
    ) -> StepResult {
        if !matches!(text, "menu" | "меню") && graph.qna_allowed(START) {
            return self.qna_response(graph, key, state, event, START).await;
        }

        if graph.first_greeting() {
            if let Err(err) = self
                .gateway
                .send_text(event.user_id, graph.greeting_message(), None)
                .await
            {
                warn!(error = %err, "greeting send failed");
            }
            if !self.settings.greeting_pause.is_zero() {
                tokio::time::sleep(self.settings.greeting_pause).await;
            }
        }
        self.send_menu(graph, key, state, START).await
    }

    /// A free-text value arrived for an in-flight capture.
    async fn handle_wait_send(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        event: &InboundEvent,
        text: &str,
    ) -> StepResult {
        let continuation = state.continuation.clone();

        if let Some(var_name) = state.pending_input().map(str::to_string) {
            self.sessions
                .change_variable(key, state, &var_name, &event.text)
                .await?;
        }
        self.sessions.clear_volatile(key, state).await?;

        // An explicit cancel wins over the continuation.
        let pressed = graph.find_control(WAIT_SEND, text);
        if matches!(pressed.map(|c| &c.action), Some(Action::Back)) {
            let target = state.back_target().to_string();
            return self.send_menu(graph, key, state, &target).await;
        }

        match continuation {
            Some(control) => {
                let next = self.trigger_control(graph, key, state, &control).await?;
                self.sessions.history_append(key, state, &next).await?;
                Ok(next)
            }
            None => {
                warn!("no continuation for captured input");
                Ok(self.final_send(graph, key, state, None).await)
            }
        }
    }

    /// Regular menu state: resolve the pressed control or fall back.
    async fn handle_menu_state(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        event: &InboundEvent,
        current: &str,
        text: &str,
    ) -> StepResult {
        // The store can hold a state the reloaded document no longer has.
        if graph.node(current).is_none() {
            warn!(state = current, "session points at an unknown menu");
            if let Err(err) = self
                .gateway
                .send_text(
                    event.user_id,
                    &graph.errors().command_unknown,
                    graph.keyboard(START).as_ref(),
                )
                .await
            {
                warn!(error = %err, "unknown-state notice failed");
            }
            return Ok(GREETINGS.to_string());
        }

        match graph.find_control(current, text).cloned() {
            Some(control) => {
                let next = self.trigger_control(graph, key, state, &control).await?;
                self.sessions.history_append(key, state, &next).await?;
                Ok(next)
            }
            None => {
                if graph.qna_allowed(current) {
                    return self.qna_response(graph, key, state, event, current).await;
                }
                if let Err(err) = self
                    .gateway
                    .send_text(
                        event.user_id,
                        &graph.errors().command_unknown,
                        graph.keyboard(current).as_ref(),
                    )
                    .await
                {
                    warn!(error = %err, "unknown-command notice failed");
                }
                Ok(current.to_string())
            }
        }
    }

    /// Knowledge-base detour: serve the best answer in place, or render
    /// the fail menu on a miss. Selection acknowledgment is detached.
    async fn qna_response(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        event: &InboundEvent,
        current: &str,
    ) -> StepResult {
        let reply = match self.qna.query(event.user_id, false, false).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "knowledge base lookup failed");
                return self.send_menu(graph, key, state, FAIL_QNA).await;
            }
        };

        let Some(answer) = reply.best() else {
            return self.send_menu(graph, key, state, FAIL_QNA).await;
        };

        let qna = self.qna.clone();
        let (request_id, result_id) = (reply.request_id, answer.id);
        tokio::spawn(async move {
            if let Err(err) = qna.mark_selected(request_id, result_id).await {
                warn!(error = %err, "qna selection ack failed");
            }
        });

        if answer.closes_treatment() {
            if let Err(err) = self.gateway.send_text(event.user_id, &answer.text, None).await {
                warn!(error = %err, "qna goodbye send failed");
            }
            if let Err(err) = self.gateway.close_treatment(event.user_id).await {
                warn!(error = %err, "treatment close failed");
            }
            return Ok(current.to_string());
        }

        if let Err(err) = self
            .gateway
            .send_text(event.user_id, &answer.text, graph.keyboard(current).as_ref())
            .await
        {
            warn!(error = %err, "qna answer send failed");
        }
        Ok(current.to_string())
    }

    /// Render a menu's reply fragments and keyboard, then run its
    /// auto-trigger control if it has one.
    fn send_menu<'a>(
        &'a self,
        graph: &'a MenuGraph,
        key: &'a SessionKey,
        state: &'a mut SessionState,
        to: &'a str,
    ) -> BoxFuture<'a, StepResult> {
        Box::pin(async move {
            let Some(node) = graph.node(to) else {
                warn!(menu = to, "navigation to unknown menu");
                return Ok(self.final_send(graph, key, state, None).await);
            };

            if let Err(err) = self
                .renderer
                .send_fragments(
                    state,
                    graph.errors(),
                    key.user_id,
                    &node.replies,
                    graph.keyboard(to).as_ref(),
                )
                .await
            {
                warn!(menu = to, error = %err, "menu rendering failed");
                return Ok(self.final_send(graph, key, state, None).await);
            }

            if let Some(trigger) = node.auto_trigger.clone() {
                let next = self.trigger_control(graph, key, state, &trigger).await?;
                self.sessions.history_append(key, state, &next).await?;
                return Ok(next);
            }
            Ok(to.to_string())
        })
    }

    /// Execute exactly one control: render its reply fragments, then take
    /// its single action branch.
    async fn trigger_control(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        control: &Control,
    ) -> StepResult {
        let user = key.user_id;

        // A back press pops the history before anything renders.
        let mut destination = control.goto.clone();
        if matches!(control.action, Action::Back) {
            self.sessions.history_back(key, state).await?;
            destination = Some(state.back_target().to_string());
        }

        if let Err(err) = self
            .renderer
            .send_fragments(state, graph.errors(), user, &control.replies, None)
            .await
        {
            warn!(error = %err, "control reply rendering failed");
            return Ok(self.final_send(graph, key, state, None).await);
        }

        match &control.action {
            Action::Navigate | Action::Back => {
                let target = destination.unwrap_or_else(|| FINAL.to_string());
                self.send_menu(graph, key, state, &target).await
            }

            Action::Close => {
                if let Err(err) = self.gateway.close_treatment(user).await {
                    warn!(error = %err, "treatment close failed");
                }
                Ok(GREETINGS.to_string())
            }

            Action::Redirect => {
                if let Err(err) = self.gateway.reroute_treatment(user).await {
                    warn!(error = %err, "treatment reroute failed");
                }
                Ok(GREETINGS.to_string())
            }

            Action::AppointSpecialist(spec) => {
                match self.gateway.specialist_available(*spec).await {
                    Ok(true) => {}
                    Ok(false) | Err(_) => {
                        if let Err(err) = self
                            .gateway
                            .send_text(user, &graph.errors().specialist_not_available, None)
                            .await
                        {
                            warn!(error = %err, "availability notice failed");
                        }
                        return Ok(state.current_state.clone());
                    }
                }
                match self.gateway.appoint_specialist(user, *spec).await {
                    Ok(()) => Ok(GREETINGS.to_string()),
                    Err(err) => {
                        warn!(error = %err, "specialist appointment failed");
                        Ok(self.final_send(graph, key, state, None).await)
                    }
                }
            }

            Action::AppointRandomFrom(wanted) => {
                let available = match self.gateway.available_specialists().await {
                    Ok(available) => available,
                    Err(err) => {
                        warn!(error = %err, "available specialist lookup failed");
                        Vec::new()
                    }
                };
                let wanted: HashSet<&Uuid> = wanted.iter().collect();
                let candidates: Vec<Uuid> = available
                    .into_iter()
                    .filter(|id| wanted.contains(id))
                    .collect();

                if candidates.is_empty() {
                    if let Err(err) = self
                        .gateway
                        .send_text(user, &graph.errors().specialists_not_available, None)
                        .await
                    {
                        warn!(error = %err, "availability notice failed");
                    }
                    return Ok(state.current_state.clone());
                }

                let chosen = candidates[rand::thread_rng().gen_range(0..candidates.len())];
                match self.gateway.appoint_specialist(user, chosen).await {
                    Ok(()) => Ok(GREETINGS.to_string()),
                    Err(err) => {
                        warn!(error = %err, "specialist appointment failed");
                        Ok(self.final_send(graph, key, state, None).await)
                    }
                }
            }

            Action::RerouteLine(line) => {
                let subscribed = match self.gateway.subscriptions(user, *line).await {
                    Ok(subscriptions) => !subscriptions.is_empty(),
                    Err(err) => {
                        warn!(error = %err, "subscription lookup failed");
                        return Ok(self.final_send(graph, key, state, None).await);
                    }
                };
                if !subscribed {
                    if let Err(err) = self
                        .gateway
                        .send_text(user, &graph.errors().line_not_available, None)
                        .await
                    {
                        warn!(error = %err, "availability notice failed");
                    }
                    return Ok(state.current_state.clone());
                }
                match self.gateway.reroute_line(user, *line, None).await {
                    Ok(()) => Ok(GREETINGS.to_string()),
                    Err(err) => {
                        warn!(error = %err, "line reroute failed");
                        Ok(self.final_send(graph, key, state, None).await)
                    }
                }
            }

            Action::Exec(command) => self.exec_command(graph, key, state, control, command).await,

            Action::Capture(capture) => {
                let user = key.user_id;
                let mut keyboard = Keyboard::new();
                for option in &capture.offer_options {
                    match template::render(state, option) {
                        Ok(rendered) => keyboard.push_row("", rendered),
                        Err(err) => {
                            warn!(error = %err, "offer option rendering failed");
                            return Ok(self.final_send(graph, key, state, None).await);
                        }
                    }
                }
                if let Some(wait_keyboard) = graph.keyboard(WAIT_SEND) {
                    keyboard.extend(wait_keyboard);
                }

                match capture.send_text.as_deref().filter(|t| !t.is_empty()) {
                    Some(prompt) => {
                        let rendered = match template::render(state, prompt) {
                            Ok(rendered) => rendered,
                            Err(err) => {
                                warn!(error = %err, "capture prompt rendering failed");
                                return Ok(self.final_send(graph, key, state, None).await);
                            }
                        };
                        if let Err(err) = self
                            .gateway
                            .send_text(user, &rendered, Some(&keyboard))
                            .await
                        {
                            warn!(error = %err, "capture prompt send failed");
                        }
                    }
                    None => {
                        // Fall back to the wait menu's own prompt.
                        let fragments = graph
                            .node(WAIT_SEND)
                            .map(|node| node.replies.clone())
                            .unwrap_or_default();
                        if let Err(err) = self
                            .renderer
                            .send_fragments(
                                state,
                                graph.errors(),
                                user,
                                &fragments,
                                Some(&keyboard),
                            )
                            .await
                        {
                            warn!(error = %err, "capture prompt rendering failed");
                            return Ok(self.final_send(graph, key, state, None).await);
                        }
                    }
                }

                self.sessions
                    .set_pending_input(key, state, &capture.var_name)
                    .await?;
                self.sessions
                    .set_continuation(key, state, Some((*capture.continuation).clone()))
                    .await?;
                Ok(WAIT_SEND.to_string())
            }

            Action::Ticket(spec) => {
                self.sessions
                    .set_continuation(key, state, Some(control.clone()))
                    .await?;
                let channel = spec.channel_id;
                self.sessions
                    .change_ticket(key, state, move |draft| draft.channel_id = Some(channel))
                    .await?;
                self.advance_stage(graph, key, state, spec, TicketField::Theme)
                    .await
            }
        }
    }

    /// Run a configured command: tokenize first, substitute per token, so
    /// substituted values cannot break out of their argument.
    async fn exec_command(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        control: &Control,
        command: &str,
    ) -> StepResult {
        // Collapse spacing inside template markers so they tokenize whole.
        let mut command = command.to_string();
        while command.contains("{{ ") || command.contains(" }}") {
            command = command.replace("{{ ", "{{").replace(" }}", "}}");
        }

        let tokens = match shellwords::split(&command) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "command tokenization failed");
                return Ok(self.final_send(graph, key, state, None).await);
            }
        };

        let mut argv = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match template::render(state, token) {
                Ok(rendered) => argv.push(rendered),
                Err(err) => {
                    warn!(error = %err, "command substitution failed");
                    return Ok(self.final_send(graph, key, state, None).await);
                }
            }
        }

        match self.runner.run(&argv, self.settings.exec_timeout).await {
            Ok(output) => {
                if let Err(err) = self.gateway.send_text(key.user_id, &output, None).await {
                    warn!(error = %err, "command output send failed");
                }
                let target = control.goto.clone().unwrap_or_else(|| FINAL.to_string());
                self.send_menu(graph, key, state, &target).await
            }
            Err(err) => {
                Ok(self
                    .final_send(graph, key, state, Some(format!("Error: {err}")))
                    .await)
            }
        }
    }

    /// The single recovery path: report the failure, clear the session's
    /// volatile fields and land the user on the terminal menu.
    async fn final_send(
        &self,
        graph: &MenuGraph,
        key: &SessionKey,
        state: &mut SessionState,
        message: Option<String>,
    ) -> String {
        let text = message.unwrap_or_else(|| graph.errors().button_processing.clone());
        if let Err(err) = self.gateway.send_text(key.user_id, &text, None).await {
            warn!(error = %err, "error notice send failed");
        }

        if let Err(err) = self.sessions.history_clear(key, state).await {
            warn!(error = %err, "history clear failed during recovery");
        }

        if let Some(node) = graph.node(FINAL) {
            if let Err(err) = self
                .renderer
                .send_fragments(
                    state,
                    graph.errors(),
                    key.user_id,
                    &node.replies,
                    graph.keyboard(FINAL).as_ref(),
                )
                .await
            {
                warn!(error = %err, "terminal menu rendering failed");
            }
        }
        FINAL.to_string()
    }
}
