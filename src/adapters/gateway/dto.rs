//! Wire DTOs for the messaging gateway REST API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::menu::Keyboard;
use crate::domain::session::{Specialist, UserProfile};

/// Body of a text message send.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub line_id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

/// Body of treatment lifecycle calls.
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentRequest {
    pub line_id: Uuid,
    pub user_id: Uuid,
}

/// Body of a line reroute.
#[derive(Debug, Clone, Serialize)]
pub struct RerouteRequest {
    pub line_id: Uuid,
    pub user_id: Uuid,
    pub to_line: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

/// Body of a specialist appointment.
#[derive(Debug, Clone, Serialize)]
pub struct AppointRequest {
    pub line_id: Uuid,
    pub user_id: Uuid,
    pub spec_id: Uuid,
}

/// Body of a webhook registration.
#[derive(Debug, Clone, Serialize)]
pub struct HookRequest {
    pub url: String,
}

/// Availability probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub available: bool,
}

/// Subscriber profile as returned by the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberDto {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub patronymic: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub counterpart_owner_id: Option<Uuid>,
}

impl From<SubscriberDto> for UserProfile {
    fn from(dto: SubscriberDto) -> Self {
        UserProfile {
            user_id: dto.user_id,
            name: dto.name,
            surname: dto.surname,
            patronymic: dto.patronymic,
            email: dto.email,
            counterpart_owner_id: dto.counterpart_owner_id,
        }
    }
}

/// Specialist profile as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecialistDto {
    pub user_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub patronymic: String,
}

impl From<SpecialistDto> for Specialist {
    fn from(dto: SpecialistDto) -> Self {
        Specialist {
            user_id: dto.user_id,
            name: dto.name,
            surname: dto.surname,
            patronymic: dto.patronymic,
        }
    }
}
