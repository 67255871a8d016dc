//! REST client for the knowledge-base lookup service.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::ports::{KnowledgeBase, QnaError, QnaReply};

#[derive(Debug, Clone, Serialize)]
struct QnaRequest {
    line_id: Uuid,
    user_id: Uuid,
    skip_greetings: bool,
    skip_goodbyes: bool,
}

#[derive(Debug, Clone, Serialize)]
struct SelectedRequest {
    request_id: Uuid,
    result_id: Uuid,
}

/// Line-scoped knowledge-base client. Shares the gateway's API surface
/// and credentials.
#[derive(Debug, Clone)]
pub struct RestKnowledgeBase {
    http: reqwest::Client,
    base_url: String,
    line_id: Uuid,
    login: String,
    password: String,
}

impl RestKnowledgeBase {
    pub fn new(config: &GatewayConfig, line_id: Uuid) -> Result<Self, QnaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| QnaError::Request(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            line_id,
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, QnaError> {
        let response = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.login, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(|err| QnaError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QnaError::Request(format!("status {status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl KnowledgeBase for RestKnowledgeBase {
    async fn query(
        &self,
        user: Uuid,
        skip_greetings: bool,
        skip_goodbyes: bool,
    ) -> Result<QnaReply, QnaError> {
        let body = QnaRequest {
            line_id: self.line_id,
            user_id: user,
            skip_greetings,
            skip_goodbyes,
        };
        self.send(reqwest::Method::POST, "/line/qna/", &body)
            .await?
            .json()
            .await
            .map_err(|err| QnaError::Payload(err.to_string()))
    }

    async fn mark_selected(&self, request: Uuid, result: Uuid) -> Result<(), QnaError> {
        let body = SelectedRequest {
            request_id: request,
            result_id: result,
        };
        self.send(reqwest::Method::PUT, "/line/qna/selected/", &body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qna_request_serializes_flags() {
        let body = QnaRequest {
            line_id: Uuid::nil(),
            user_id: Uuid::nil(),
            skip_greetings: true,
            skip_goodbyes: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["skip_greetings"], true);
        assert_eq!(json["skip_goodbyes"], false);
    }
}
