//! Message gateway port.
//!
//! Outbound REST surface of the chat platform: message delivery,
//! treatment lifecycle, specialist directory and webhook management.

use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

use crate::domain::menu::Keyboard;
use crate::domain::session::{Specialist, UserProfile};

/// Errors from the messaging gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected gateway payload: {0}")]
    Payload(String),
}

/// Port for the messaging gateway REST API.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Send a text message, optionally with a reply keyboard.
    async fn send_text(
        &self,
        user: Uuid,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GatewayError>;

    /// Send a file, optionally with a caption and a reply keyboard.
    async fn send_file(
        &self,
        user: Uuid,
        is_image: bool,
        file_name: &str,
        path: &Path,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GatewayError>;

    /// Remove the reply keyboard from the chat.
    async fn drop_keyboard(&self, user: Uuid) -> Result<(), GatewayError>;

    /// Start a treatment for the user.
    async fn start_treatment(&self, user: Uuid) -> Result<(), GatewayError>;

    /// Close the user's active treatment.
    async fn close_treatment(&self, user: Uuid) -> Result<(), GatewayError>;

    /// Hand the treatment to the specialist appointment queue.
    async fn reroute_treatment(&self, user: Uuid) -> Result<(), GatewayError>;

    /// Move the treatment to another line.
    async fn reroute_line(
        &self,
        user: Uuid,
        line: Uuid,
        quote: Option<&str>,
    ) -> Result<(), GatewayError>;

    /// Appoint a specific specialist to the treatment.
    async fn appoint_specialist(&self, user: Uuid, specialist: Uuid) -> Result<(), GatewayError>;

    /// Whether a specific specialist is currently available.
    async fn specialist_available(&self, specialist: Uuid) -> Result<bool, GatewayError>;

    /// Ids of all currently available specialists.
    async fn available_specialists(&self) -> Result<Vec<Uuid>, GatewayError>;

    /// Specialists working the bot's line, with profile names.
    async fn specialists_on_line(&self) -> Result<Vec<Specialist>, GatewayError>;

    /// Line ids the user is subscribed to, filtered by `line`.
    async fn subscriptions(&self, user: Uuid, line: Uuid) -> Result<Vec<Uuid>, GatewayError>;

    /// Subscriber profile, captured into the session on first contact.
    async fn subscriber_profile(&self, user: Uuid) -> Result<UserProfile, GatewayError>;

    /// Profile of a single specialist.
    async fn specialist_profile(&self, specialist: Uuid) -> Result<Specialist, GatewayError>;

    /// Register the inbound webhook for the bot's line.
    async fn register_hook(&self, callback_url: &str) -> Result<(), GatewayError>;

    /// Remove the inbound webhook for the bot's line.
    async fn remove_hook(&self) -> Result<(), GatewayError>;
}
