//! Payment processor notifications.
//!
//! The response body always echoes the event kind when one was parsed, so
//! failed deliveries can be matched up in the processor dashboard.

use crate::orders::WebhookError;
use crate::payments::webhook::SIGNATURE_HEADER;
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body of every webhook response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// Whether the notification was acknowledged
    pub received: bool,
    /// Event kind, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Event id, on processing failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receive a signed notification.
///
/// The signature is checked on the raw bytes before anything is parsed.
/// Once the event is authentic and well formed the answer is 200, including
/// for events that change nothing, so the processor stops retrying.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.orders.handle_webhook(&body, signature).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(WebhookResponse {
                received: true,
                event: Some(receipt.kind),
                event_id: None,
                error: None,
            }),
        )
            .into_response(),
        Err(err) => rejection(err),
    }
}

fn rejection(err: WebhookError) -> Response {
    let (status, body) = match err {
        WebhookError::NotConfigured => {
            tracing::error!("Webhook received but no signing secret is configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                WebhookResponse {
                    received: false,
                    event: None,
                    event_id: None,
                    error: Some(err.to_string()),
                },
            )
        }
        WebhookError::Signature(_) | WebhookError::Payload(_) => (
            StatusCode::BAD_REQUEST,
            WebhookResponse {
                received: false,
                event: None,
                event_id: None,
                error: Some(err.to_string()),
            },
        ),
        WebhookError::Processing { kind, event_id, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            WebhookResponse {
                received: false,
                event: Some(kind),
                event_id: Some(event_id),
                error: Some("Webhook handler failed".to_string()),
            },
        ),
    };
    (status, Json(body)).into_response()
}
