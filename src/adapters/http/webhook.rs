//! Inbound webhook handler.
//!
//! Accepts one pushed event, acknowledges immediately and processes on a
//! spawned task — the gateway must not depend on the response body
//! reflecting the processing outcome.

use axum::extract::State;
use axum::Json;
use http::StatusCode;
use std::sync::Arc;
use tracing::warn;

use crate::application::BotRegistry;

use super::dto::PushEvent;

/// Shared state of the webhook router.
#[derive(Clone)]
pub struct WebhookState {
    pub bots: Arc<BotRegistry>,
}

/// POST /push/receive/ - accept one gateway event.
pub async fn receive_event(
    State(state): State<WebhookState>,
    Json(push): Json<PushEvent>,
) -> StatusCode {
    let event = match push.into_event() {
        Ok(event) => event,
        Err(code) => {
            warn!(code, "unsupported event type code");
            return StatusCode::BAD_REQUEST;
        }
    };

    // React to subscriber messages only, not agent-authored echoes.
    if event.is_agent_echo() {
        return StatusCode::OK;
    }

    let Some(dispatcher) = state.bots.get(event.line_id) else {
        warn!(line = %event.line_id, "event for an unserved line");
        return StatusCode::OK;
    };

    tokio::spawn(async move {
        if let Err(err) = dispatcher.process(event).await {
            warn!(error = %err, "event processing failed");
        }
    });

    StatusCode::OK
}
