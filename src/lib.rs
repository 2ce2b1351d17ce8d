use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

pub mod clerk;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod stripe;
pub mod webhook;

use dispatcher::{DispatchOutcome, WebhookDispatcher};
use error::DispatchError;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const WEBHOOK_PATH: &str = "/api/webhooks/stripe";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: WebhookDispatcher,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handle_webhook))
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, DispatchError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    let response = match state.dispatcher.handle(signature, &body).await? {
        DispatchOutcome::Processed => WebhookResponse {
            received: true,
            message: None,
        },
        DispatchOutcome::Ignored(_) => WebhookResponse {
            received: false,
            message: Some("Unhandled event type".to_string()),
        },
    };

    Ok(Json(response))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now()
    }))
}
