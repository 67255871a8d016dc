//! HTTP DTOs for the inbound webhook.
//!
//! These types mirror the gateway's push payload and decouple the wire
//! shape from the dispatcher's event type.

use serde::Deserialize;
use uuid::Uuid;

use crate::application::event::{EventKind, InboundEvent};

/// Push payload as posted by the messaging gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub line_id: Uuid,
    pub user_id: Uuid,
    pub message_id: Uuid,
    /// Numeric message-type code.
    pub message_type: u16,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub message_time: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub data: PushPayload,
}

/// Extra payload attached to some events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub redirect: Option<String>,
}

impl PushEvent {
    /// Convert into the dispatcher's event, rejecting unknown type codes.
    pub fn into_event(self) -> Result<InboundEvent, u16> {
        let kind = EventKind::try_from(self.message_type)?;
        Ok(InboundEvent {
            line_id: self.line_id,
            user_id: self.user_id,
            message_id: self.message_id,
            kind,
            author_id: self.author_id,
            text: self.text,
            redirect_hint: self.data.redirect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gateway_payload() {
        let json = serde_json::json!({
            "line_id": "4e48509f-6366-4897-9544-46f006e47074",
            "user_id": "4e48509f-6366-4897-9544-46f006e47075",
            "message_id": "4e48509f-6366-4897-9544-46f006e47076",
            "message_type": 1,
            "message_time": "1700000000",
            "text": "hello"
        });
        let push: PushEvent = serde_json::from_value(json).unwrap();
        let event = push.into_event().unwrap();
        assert_eq!(event.kind, EventKind::Text);
        assert_eq!(event.text, "hello");
        assert!(event.author_id.is_none());
    }

    #[test]
    fn unknown_type_code_is_surfaced() {
        let json = serde_json::json!({
            "line_id": Uuid::nil(),
            "user_id": Uuid::nil(),
            "message_id": Uuid::nil(),
            "message_type": 999
        });
        let push: PushEvent = serde_json::from_value(json).unwrap();
        assert_eq!(push.into_event().unwrap_err(), 999);
    }

    #[test]
    fn redirect_hint_carries_through() {
        let json = serde_json::json!({
            "line_id": Uuid::nil(),
            "user_id": Uuid::nil(),
            "message_id": Uuid::nil(),
            "message_type": 89,
            "data": { "redirect": "other-line" }
        });
        let push: PushEvent = serde_json::from_value(json).unwrap();
        let event = push.into_event().unwrap();
        assert_eq!(event.redirect_hint.as_deref(), Some("other-line"));
    }
}
