//! REST client for the messaging gateway.
//!
//! One client serves one line: every request carries the line id the bot
//! was registered for, and outbound messages are stamped with the
//! configured author id.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::domain::menu::Keyboard;
use crate::domain::session::{Specialist, UserProfile};
use crate::ports::{GatewayError, MessageGateway};

use super::dto::{
    AppointRequest, AvailabilityResponse, HookRequest, MessageRequest, RerouteRequest,
    SpecialistDto, SubscriberDto, TreatmentRequest,
};

/// Line-scoped messaging gateway client.
#[derive(Debug, Clone)]
pub struct RestMessageGateway {
    http: reqwest::Client,
    base_url: String,
    line_id: Uuid,
    author_id: Option<Uuid>,
    login: String,
    password: String,
}

impl RestMessageGateway {
    /// Build a client for one served line.
    pub fn new(config: &GatewayConfig, line_id: Uuid) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| GatewayError::Request(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            line_id,
            author_id: config.author_id,
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }

    pub fn line_id(&self) -> Uuid {
        self.line_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn invoke<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .basic_auth(&self.login, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| GatewayError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), GatewayError> {
        self.invoke(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        self.invoke::<()>(Method::GET, path, None)
            .await?
            .json()
            .await
            .map_err(|err| GatewayError::Payload(err.to_string()))
    }

    fn treatment_body(&self, user: Uuid) -> TreatmentRequest {
        TreatmentRequest {
            line_id: self.line_id,
            user_id: user,
        }
    }
}

#[async_trait]
impl MessageGateway for RestMessageGateway {
    async fn send_text(
        &self,
        user: Uuid,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GatewayError> {
        let body = MessageRequest {
            line_id: self.line_id,
            user_id: user,
            author_id: self.author_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        };
        self.post("/line/send/message/", &body).await
    }

    async fn send_file(
        &self,
        user: Uuid,
        is_image: bool,
        file_name: &str,
        path: &Path,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GatewayError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| GatewayError::Request(err.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .text("line_id", self.line_id.to_string())
            .text("user_id", user.to_string())
            .text("is_image", is_image.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            );
        if let Some(author) = self.author_id {
            form = form.text("author_id", author.to_string());
        }
        if let Some(caption) = caption {
            form = form.text("comment", caption.to_string());
        }
        if let Some(keyboard) = keyboard {
            let encoded = serde_json::to_string(keyboard)
                .map_err(|err| GatewayError::Payload(err.to_string()))?;
            form = form.text("keyboard", encoded);
        }

        let response = self
            .http
            .post(self.url("/line/send/file/"))
            .basic_auth(&self.login, Some(&self.password))
            .multipart(form)
            .send()
            .await
            .map_err(|err| GatewayError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn drop_keyboard(&self, user: Uuid) -> Result<(), GatewayError> {
        self.post("/line/drop/keyboard/", &self.treatment_body(user))
            .await
    }

    async fn start_treatment(&self, user: Uuid) -> Result<(), GatewayError> {
        self.post("/line/treatment/start/", &self.treatment_body(user))
            .await
    }

    async fn close_treatment(&self, user: Uuid) -> Result<(), GatewayError> {
        self.post("/line/treatment/close/", &self.treatment_body(user))
            .await
    }

    async fn reroute_treatment(&self, user: Uuid) -> Result<(), GatewayError> {
        self.post("/line/appoint/start/", &self.treatment_body(user))
            .await
    }

    async fn reroute_line(
        &self,
        user: Uuid,
        line: Uuid,
        quote: Option<&str>,
    ) -> Result<(), GatewayError> {
        let body = RerouteRequest {
            line_id: self.line_id,
            user_id: user,
            to_line: line,
            quote: quote.map(str::to_string),
        };
        self.post("/line/reroute/", &body).await
    }

    async fn appoint_specialist(&self, user: Uuid, specialist: Uuid) -> Result<(), GatewayError> {
        let body = AppointRequest {
            line_id: self.line_id,
            user_id: user,
            spec_id: specialist,
        };
        self.post("/line/appoint/spec/", &body).await
    }

    async fn specialist_available(&self, specialist: Uuid) -> Result<bool, GatewayError> {
        let response: AvailabilityResponse = self
            .get_json(&format!("/line/specialist/{specialist}/available/"))
            .await?;
        Ok(response.available)
    }

    async fn available_specialists(&self) -> Result<Vec<Uuid>, GatewayError> {
        self.get_json("/line/specialists/available/").await
    }

    async fn specialists_on_line(&self) -> Result<Vec<Specialist>, GatewayError> {
        let specialists: Vec<SpecialistDto> = self
            .get_json(&format!("/line/specialists/?line_id={}", self.line_id))
            .await?;
        Ok(specialists.into_iter().map(Into::into).collect())
    }

    async fn subscriptions(&self, user: Uuid, line: Uuid) -> Result<Vec<Uuid>, GatewayError> {
        self.get_json(&format!(
            "/line/subscriptions/?user_id={user}&line_id={line}"
        ))
        .await
    }

    async fn subscriber_profile(&self, user: Uuid) -> Result<UserProfile, GatewayError> {
        let dto: SubscriberDto = self.get_json(&format!("/line/subscriber/{user}/")).await?;
        Ok(dto.into())
    }

    async fn specialist_profile(&self, specialist: Uuid) -> Result<Specialist, GatewayError> {
        let dto: SpecialistDto = self
            .get_json(&format!("/line/specialist/{specialist}/"))
            .await?;
        Ok(dto.into())
    }

    async fn register_hook(&self, callback_url: &str) -> Result<(), GatewayError> {
        let body = HookRequest {
            url: callback_url.to_string(),
        };
        self.post(&format!("/hook/bot/{}/", self.line_id), &body)
            .await
    }

    async fn remove_hook(&self) -> Result<(), GatewayError> {
        let path = format!("/hook/bot/{}/", self.line_id);
        match self.invoke::<()>(Method::DELETE, &path, None).await {
            Ok(_) => Ok(()),
            // A hook that was never registered is fine to "remove".
            Err(GatewayError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://gw.example.com/v1/".to_string(),
            login: "bot".to_string(),
            password: "secret".to_string(),
            author_id: None,
            lines: Uuid::nil().to_string(),
        }
    }

    #[test]
    fn base_url_is_normalized() {
        let client = RestMessageGateway::new(&test_config(), Uuid::nil()).unwrap();
        assert_eq!(
            client.url("/line/send/message/"),
            "https://gw.example.com/v1/line/send/message/"
        );
    }

    #[test]
    fn client_keeps_its_line() {
        let line = Uuid::new_v4();
        let client = RestMessageGateway::new(&test_config(), line).unwrap();
        assert_eq!(client.line_id(), line);
    }
}
