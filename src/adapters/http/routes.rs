//! HTTP routes for the webhook endpoint.

use axum::{routing::post, Router};

use super::webhook::{receive_event, WebhookState};

/// Creates the webhook router.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/push/receive/", post(receive_event))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::BotRegistry;
    use std::sync::Arc;

    #[test]
    fn webhook_routes_compiles() {
        let state = WebhookState {
            bots: Arc::new(BotRegistry::new()),
        };
        let _router = webhook_routes(state);
    }
}
