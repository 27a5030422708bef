use std::sync::Arc;

use axum::{
    Json, debug_handler,
    body::Bytes,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use tracing::{Instrument, debug, info, warn};
use waflow_bus::{BusClient, inbound_subject, status_subject, to_value};
use waflow_core::StoredMessage;
use waflow_core::platforms::whatsapp::webhook::SIGNATURE_HEADER;
use waflow_core::platforms::whatsapp::{
    InboundEvent, VerifyQuery, WebhookPayload, extract_events, verify_challenge, verify_signature,
};
use waflow_telemetry::record_webhook_event;

use crate::http::{ApiFailure, ApiResult, GatewayState, api_error, bad_request};

/// Subscription handshake: echoes `hub.challenge` when the token matches.
#[debug_handler]
pub async fn verify(
    Extension(state): Extension<Arc<GatewayState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<String, ApiFailure> {
    match verify_challenge(&query, state.verify_token.as_deref()) {
        Some(challenge) => {
            info!("webhook verified");
            Ok(challenge)
        }
        None => {
            warn!(mode = ?query.mode, "webhook verification failed");
            Err(api_error(StatusCode::FORBIDDEN, "Verification failed"))
        }
    }
}

#[debug_handler]
pub async fn receive(
    Extension(state): Extension<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    if let Some(secret) = state.app_secret.as_deref() {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        if !verify_signature(secret, header, &body) {
            warn!("webhook signature mismatch");
            return Err(api_error(StatusCode::UNAUTHORIZED, "invalid signature"));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|err| bad_request(format!("invalid webhook payload: {err}")))?;
    let events = extract_events(&payload);
    let span = tracing::info_span!("webhook", object = %payload.object, events = events.len());

    async {
        for event in &events {
            apply(&state, event).await;
        }
    }
    .instrument(span)
    .await;

    Ok(Json(json!({ "success": true })))
}

async fn apply(state: &GatewayState, event: &InboundEvent) {
    record_webhook_event(event.kind());
    match event {
        InboundEvent::Message(message) => {
            info!(phone = %message.from, id = %message.id, "inbound message");
            state.store.add(StoredMessage::inbound(message)).await;
        }
        InboundEvent::Status(update) => {
            let known = state
                .store
                .update_status(&update.message_id, update.status.into())
                .await;
            if !known {
                debug!(id = %update.message_id, "status for a message not in the log");
            }
        }
    }
    if let Some(bus) = &state.bus {
        relay(bus.as_ref(), event).await;
    }
}

/// Bus failures are logged; the webhook is still acknowledged so WhatsApp does not retry.
async fn relay(bus: &dyn BusClient, event: &InboundEvent) {
    let subject = match event {
        InboundEvent::Message(message) => inbound_subject(&message.phone_number_id, &message.from),
        InboundEvent::Status(update) => status_subject(&update.phone_number_id),
    };
    let published = match to_value(event) {
        Ok(value) => bus.publish_value(&subject, value).await,
        Err(err) => Err(err),
    };
    if let Err(err) = published {
        warn!(%subject, error = %err, "failed to relay webhook event");
    }
}
