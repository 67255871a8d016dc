//! Ticketing backend port.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::session::TicketDraft;

/// Errors from the ticketing backend.
#[derive(Debug, thiserror::Error)]
pub enum TicketingError {
    #[error("ticketing request failed: {0}")]
    Request(String),

    #[error("ticketing returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected ticketing payload: {0}")]
    Payload(String),

    #[error("ticket draft is missing required fields")]
    IncompleteDraft,

    #[error("ticket {0} is not visible yet")]
    NotVisible(Uuid),
}

/// A filing channel offered by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketChannel {
    pub id: Uuid,
    pub name: String,
}

/// A service kind, listing the lines it serves and the work types that
/// apply to it.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketKind {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub lines: Vec<Uuid>,
    #[serde(default)]
    pub types: Vec<Uuid>,
}

/// A work type within a kind.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketType {
    pub id: Uuid,
    pub name: String,
}

/// Ticket metadata scoped to one counterpart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketMetadata {
    #[serde(default)]
    pub channels: Vec<TicketChannel>,
    #[serde(default)]
    pub kinds: Vec<TicketKind>,
    #[serde(default)]
    pub types: Vec<TicketType>,
}

impl TicketMetadata {
    /// Kinds available on the given line.
    pub fn kinds_for_line(&self, line: Uuid) -> Vec<&TicketKind> {
        self.kinds
            .iter()
            .filter(|kind| kind.lines.contains(&line))
            .collect()
    }

    /// Work types applicable to the given kind.
    pub fn types_for_kind(&self, kind_id: Uuid) -> Vec<&TicketType> {
        let Some(kind) = self.kinds.iter().find(|kind| kind.id == kind_id) else {
            return Vec::new();
        };
        self.types
            .iter()
            .filter(|t| kind.types.contains(&t.id))
            .collect()
    }
}

/// A created ticket as seen by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRecord {
    pub id: Uuid,
    #[serde(default)]
    pub number: Option<String>,
}

/// Port for the ticketing backend.
#[async_trait]
pub trait TicketingSystem: Send + Sync {
    /// Submit a completed draft. Returns the external record id.
    ///
    /// # Errors
    ///
    /// - `IncompleteDraft` when required fields are missing
    /// - transport errors otherwise
    async fn create_ticket(
        &self,
        user: Uuid,
        line: Uuid,
        draft: &TicketDraft,
    ) -> Result<Uuid, TicketingError>;

    /// Fetch a ticket by id; used as a visibility probe after creation.
    async fn get_ticket(&self, id: Uuid) -> Result<TicketRecord, TicketingError>;

    /// Metadata (channels, kinds, types) scoped to a counterpart owner.
    async fn metadata(&self, counterpart_owner: Uuid) -> Result<TicketMetadata, TicketingError>;
}
