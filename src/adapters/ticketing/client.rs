//! REST client for the ticketing backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::TicketingConfig;
use crate::domain::session::TicketDraft;
use crate::ports::{TicketMetadata, TicketRecord, TicketingError, TicketingSystem};

#[derive(Debug, Clone, Serialize)]
struct CreateTicketRequest {
    channel_id: Uuid,
    line_id: Uuid,
    service_id: Uuid,
    type_id: Uuid,
    user_id: Uuid,
    executor_id: Uuid,
    description: String,
    summary: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateTicketResponse {
    service_request_id: Uuid,
}

/// One counterpart's metadata entry as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
struct TicketDataDto {
    counterpart_id: Uuid,
    #[serde(flatten)]
    metadata: TicketMetadata,
}

/// Line-scoped ticketing client.
#[derive(Debug, Clone)]
pub struct RestTicketingSystem {
    http: reqwest::Client,
    base_url: String,
    line_id: Uuid,
    login: String,
    password: String,
}

impl RestTicketingSystem {
    pub fn new(config: &TicketingConfig, line_id: Uuid) -> Result<Self, TicketingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| TicketingError::Request(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            line_id,
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, TicketingError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TicketingError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl TicketingSystem for RestTicketingSystem {
    async fn create_ticket(
        &self,
        user: Uuid,
        line: Uuid,
        draft: &TicketDraft,
    ) -> Result<Uuid, TicketingError> {
        let (Some(channel_id), Some(executor), Some(service), Some(service_type)) = (
            draft.channel_id,
            draft.executor.as_ref(),
            draft.service.as_ref(),
            draft.service_type.as_ref(),
        ) else {
            return Err(TicketingError::IncompleteDraft);
        };

        let body = CreateTicketRequest {
            channel_id,
            line_id: line,
            service_id: service.id,
            type_id: service_type.id,
            user_id: user,
            executor_id: executor.id,
            description: draft.description.clone(),
            summary: draft.theme.clone(),
        };

        let response = self
            .http
            .post(format!("{}/ticket/", self.base_url))
            .basic_auth(&self.login, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|err| TicketingError::Request(err.to_string()))?;

        let created: CreateTicketResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|err| TicketingError::Payload(err.to_string()))?;
        Ok(created.service_request_id)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<TicketRecord, TicketingError> {
        let response = self
            .http
            .get(format!("{}/ticket/{id}/", self.base_url))
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await
            .map_err(|err| TicketingError::Request(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TicketingError::NotVisible(id));
        }

        self.check(response)
            .await?
            .json()
            .await
            .map_err(|err| TicketingError::Payload(err.to_string()))
    }

    async fn metadata(&self, counterpart_owner: Uuid) -> Result<TicketMetadata, TicketingError> {
        let response = self
            .http
            .get(format!(
                "{}/ticket/data/?line_id={}",
                self.base_url, self.line_id
            ))
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await
            .map_err(|err| TicketingError::Request(err.to_string()))?;

        let entries: Vec<TicketDataDto> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|err| TicketingError::Payload(err.to_string()))?;

        Ok(entries
            .into_iter()
            .find(|entry| entry.counterpart_id == counterpart_owner)
            .map(|entry| entry.metadata)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::ChosenItem;

    fn client() -> RestTicketingSystem {
        let config = TicketingConfig {
            base_url: "https://desk.example.com/api".to_string(),
            login: String::new(),
            password: String::new(),
            submit_deadline_secs: 120,
            poll_attempts: 10,
            poll_interval_secs: 4,
        };
        RestTicketingSystem::new(&config, Uuid::nil()).unwrap()
    }

    #[tokio::test]
    async fn test_incomplete_draft_rejected_before_any_request() {
        let draft = TicketDraft {
            theme: "T".to_string(),
            ..Default::default()
        };
        let result = client().create_ticket(Uuid::nil(), Uuid::nil(), &draft).await;
        assert!(matches!(result, Err(TicketingError::IncompleteDraft)));
    }

    #[test]
    fn create_request_serializes_draft_fields() {
        let body = CreateTicketRequest {
            channel_id: Uuid::nil(),
            line_id: Uuid::nil(),
            service_id: Uuid::nil(),
            type_id: Uuid::nil(),
            user_id: Uuid::nil(),
            executor_id: Uuid::nil(),
            description: "D".to_string(),
            summary: "T".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["summary"], "T");
        assert_eq!(json["description"], "D");
    }

    #[test]
    fn metadata_dto_flattens_entry() {
        let json = serde_json::json!({
            "counterpart_id": Uuid::nil(),
            "kinds": [],
            "types": [],
            "channels": []
        });
        let dto: TicketDataDto = serde_json::from_value(json).unwrap();
        assert_eq!(dto.counterpart_id, Uuid::nil());
        assert!(dto.metadata.kinds.is_empty());
    }

    #[test]
    fn complete_draft_has_all_parts() {
        let draft = TicketDraft {
            channel_id: Some(Uuid::new_v4()),
            theme: "T".to_string(),
            description: "D".to_string(),
            executor: Some(ChosenItem::new(Uuid::new_v4(), "E")),
            service: Some(ChosenItem::new(Uuid::new_v4(), "S")),
            service_type: Some(ChosenItem::new(Uuid::new_v4(), "ST")),
        };
        assert!(draft.is_complete());
    }
}
