//! Inbound chat events as consumed by the dispatcher.

use uuid::Uuid;

/// Kind of an inbound gateway event. Wire values are the gateway's
/// numeric message-type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// 1 — user sent a text message
    Text,
    /// 20 — incoming call within a treatment
    CallStartTreatment,
    /// 21 — incoming call without a treatment
    CallStartNoTreatment,
    /// 70 — user sent a file
    File,
    /// 80 — treatment started by the user
    TreatmentStartByUser,
    /// 81 — treatment started by a specialist
    TreatmentStartBySpecialist,
    /// 82 — treatment closed
    TreatmentClose,
    /// 83 — no free specialists to appoint
    NoFreeSpecialists,
    /// 89 — treatment rerouted to another line
    LineRerouteOtherLine,
    /// 90 — active treatment closed
    TreatmentCloseActive,
    /// 200 — treatment handed to the bot
    TreatmentToBot,
}

impl EventKind {
    /// Whether the event carries user content (text or file).
    pub fn is_user_message(self) -> bool {
        matches!(self, EventKind::Text | EventKind::File)
    }

    pub fn code(self) -> u16 {
        match self {
            EventKind::Text => 1,
            EventKind::CallStartTreatment => 20,
            EventKind::CallStartNoTreatment => 21,
            EventKind::File => 70,
            EventKind::TreatmentStartByUser => 80,
            EventKind::TreatmentStartBySpecialist => 81,
            EventKind::TreatmentClose => 82,
            EventKind::NoFreeSpecialists => 83,
            EventKind::LineRerouteOtherLine => 89,
            EventKind::TreatmentCloseActive => 90,
            EventKind::TreatmentToBot => 200,
        }
    }
}

impl TryFrom<u16> for EventKind {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => EventKind::Text,
            20 => EventKind::CallStartTreatment,
            21 => EventKind::CallStartNoTreatment,
            70 => EventKind::File,
            80 => EventKind::TreatmentStartByUser,
            81 => EventKind::TreatmentStartBySpecialist,
            82 => EventKind::TreatmentClose,
            83 => EventKind::NoFreeSpecialists,
            89 => EventKind::LineRerouteOtherLine,
            90 => EventKind::TreatmentCloseActive,
            200 => EventKind::TreatmentToBot,
            other => return Err(other),
        })
    }
}

/// One inbound event, already validated at the webhook boundary.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub line_id: Uuid,
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub kind: EventKind,
    /// Author of the message; used to drop agent-authored echoes.
    pub author_id: Option<Uuid>,
    pub text: String,
    /// Redirect hint attached to reroute events.
    pub redirect_hint: Option<String>,
}

impl InboundEvent {
    /// Whether this is another author's message echoed back to the bot.
    pub fn is_agent_echo(&self) -> bool {
        self.kind.is_user_message()
            && self
                .author_id
                .map(|author| author != self.user_id)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for kind in [
            EventKind::Text,
            EventKind::CallStartTreatment,
            EventKind::CallStartNoTreatment,
            EventKind::File,
            EventKind::TreatmentStartByUser,
            EventKind::TreatmentStartBySpecialist,
            EventKind::TreatmentClose,
            EventKind::NoFreeSpecialists,
            EventKind::LineRerouteOtherLine,
            EventKind::TreatmentCloseActive,
            EventKind::TreatmentToBot,
        ] {
            assert_eq!(EventKind::try_from(kind.code()), Ok(kind));
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(EventKind::try_from(42), Err(42));
    }

    #[test]
    fn agent_echo_detection() {
        let mut event = InboundEvent {
            line_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            kind: EventKind::Text,
            author_id: None,
            text: "hi".to_string(),
            redirect_hint: None,
        };
        assert!(!event.is_agent_echo());

        event.author_id = Some(event.user_id);
        assert!(!event.is_agent_echo());

        event.author_id = Some(Uuid::new_v4());
        assert!(event.is_agent_echo());

        // Lifecycle events are never treated as echoes.
        event.kind = EventKind::TreatmentClose;
        assert!(!event.is_agent_echo());
    }
}
