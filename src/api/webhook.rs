//! LINE webhook handler
//!
//! Verifies the signature over the raw body, answers `200` at once and runs
//! each message event through the reply pipeline in a background task.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use secrecy::ExposeSecret;

use super::ApiState;
use crate::channels::line::{SIGNATURE_HEADER, WebhookBody, verify_signature};
use crate::relay::ReplyOutcome;

/// Handle a webhook delivery (`POST /` and `POST /callback`)
#[allow(clippy::unused_async)]
pub async fn handle_webhook(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(secret) = state.channel_secret.as_ref() else {
        tracing::error!("LINE_CHANNEL_SECRET not configured, rejecting webhook");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(secret.expose_secret(), &body, signature) {
        tracing::warn!("invalid LINE webhook signature");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "malformed webhook body");
            return (StatusCode::BAD_REQUEST, "Malformed body");
        }
    };

    tracing::debug!(
        events = payload.events.len(),
        destination = payload.destination.as_deref().unwrap_or("-"),
        "received LINE webhook"
    );

    for event in payload.events {
        let redelivery = event.is_redelivery();
        if let Some(event_id) = event.webhook_event_id.as_deref()
            && state.dedup.is_duplicate(event_id)
        {
            tracing::debug!(event_id, redelivery, "duplicate LINE event, skipping");
            continue;
        }
        if redelivery {
            tracing::info!("processing redelivered LINE event");
        }

        let event_type = event.event_type.clone();
        let Some(inbound) = event.into_inbound() else {
            tracing::debug!(%event_type, "ignoring unsupported event");
            continue;
        };

        let pipeline = state.pipeline.clone();
        tokio::spawn(async move {
            match pipeline.handle(inbound).await {
                ReplyOutcome::Failed { severity, notified } => {
                    tracing::warn!(?severity, notified, "event processing failed");
                }
                ReplyOutcome::Replied { .. } | ReplyOutcome::Skipped => {}
            }
        });
    }

    (StatusCode::OK, "OK")
}
