//! Ticket draft collected by the wizard.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wizard fields in collection order. `Confirmation` is the review step
/// rendered once all data fields are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketField {
    Theme,
    Description,
    Executor,
    Service,
    ServiceType,
    Confirmation,
}

impl TicketField {
    /// Collection order of the wizard.
    pub const ORDER: [TicketField; 6] = [
        TicketField::Theme,
        TicketField::Description,
        TicketField::Executor,
        TicketField::Service,
        TicketField::ServiceType,
        TicketField::Confirmation,
    ];

    /// Stable key stored in the pending-input variable.
    pub fn key(self) -> &'static str {
        match self {
            TicketField::Theme => "theme",
            TicketField::Description => "description",
            TicketField::Executor => "executor",
            TicketField::Service => "service",
            TicketField::ServiceType => "type",
            TicketField::Confirmation => "confirmation",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|field| field.key() == key)
    }

    /// The field collected after this one.
    pub fn next(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|f| *f == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    /// The field re-entered when the user steps back.
    pub fn predecessor(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|f| *f == self)?;
        index.checked_sub(1).and_then(|i| Self::ORDER.get(i)).copied()
    }
}

/// A choice resolved against an external directory: id plus the display
/// name shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenItem {
    pub id: Uuid,
    pub name: String,
}

impl ChosenItem {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// In-progress ticket data. Created empty when a ticket control fires and
/// cleared wholesale on cancellation, completion or error fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub channel_id: Option<Uuid>,
    pub theme: String,
    pub description: String,
    pub executor: Option<ChosenItem>,
    pub service: Option<ChosenItem>,
    pub service_type: Option<ChosenItem>,
}

impl TicketDraft {
    pub fn is_empty(&self) -> bool {
        *self == TicketDraft::default()
    }

    /// Whether every field needed for submission is present.
    pub fn is_complete(&self) -> bool {
        self.channel_id.is_some()
            && self.executor.is_some()
            && self.service.is_some()
            && self.service_type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_walks_forward_and_back() {
        assert_eq!(TicketField::Theme.next(), Some(TicketField::Description));
        assert_eq!(
            TicketField::ServiceType.next(),
            Some(TicketField::Confirmation)
        );
        assert_eq!(TicketField::Confirmation.next(), None);

        assert_eq!(
            TicketField::Confirmation.predecessor(),
            Some(TicketField::ServiceType)
        );
        assert_eq!(TicketField::Theme.predecessor(), None);
    }

    #[test]
    fn keys_round_trip() {
        for field in TicketField::ORDER {
            assert_eq!(TicketField::parse(field.key()), Some(field));
        }
        assert_eq!(TicketField::parse("unknown"), None);
    }

    #[test]
    fn empty_draft_is_incomplete() {
        let draft = TicketDraft::default();
        assert!(draft.is_empty());
        assert!(!draft.is_complete());
    }

    #[test]
    fn full_draft_is_complete() {
        let draft = TicketDraft {
            channel_id: Some(Uuid::new_v4()),
            theme: "T".to_string(),
            description: "D".to_string(),
            executor: Some(ChosenItem::new(Uuid::new_v4(), "E")),
            service: Some(ChosenItem::new(Uuid::new_v4(), "S")),
            service_type: Some(ChosenItem::new(Uuid::new_v4(), "ST")),
        };
        assert!(draft.is_complete());
        assert!(!draft.is_empty());
    }
}
