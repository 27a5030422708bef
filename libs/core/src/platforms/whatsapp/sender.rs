use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};
use waflow_telemetry::{Outcome, record_send};

use super::creds::WhatsAppCredentials;
use super::graph::GraphClient;
use crate::egress::{MediaUpload, MessageSender, SendResult};
use crate::error::{GatewayError, GatewayResult};
use crate::outbound::OutboundMessage;

/// Sends messages through `POST /{phone_number_id}/messages`.
///
/// An `api_base` starting with `mock://` skips the network and returns
/// synthetic ids, which keeps local runs and tests offline.
#[derive(Clone)]
pub struct WhatsAppSender {
    graph: GraphClient,
}

impl WhatsAppSender {
    pub fn new(http: reqwest::Client, creds: &WhatsAppCredentials) -> Self {
        Self {
            graph: GraphClient::new(http, creds),
        }
    }

    pub fn api_base(&self) -> &str {
        self.graph.api_base()
    }

    fn phone_number_id(&self) -> GatewayResult<&str> {
        self.graph.creds().phone_number_id()
    }

    fn messages_path(&self, phone_id: &str) -> String {
        format!("{phone_id}/messages")
    }

    async fn deliver(&self, to: &str, message: &OutboundMessage) -> GatewayResult<SendResult> {
        let phone_id = self.phone_number_id()?;
        if to.trim().is_empty() {
            return Err(GatewayError::InvalidRecipient(to.to_string()));
        }
        let payload = message.to_payload(to);

        if self.graph.is_mock() {
            return Ok(SendResult {
                message_id: Some(format!("mock:{phone_id}")),
                raw: Some(payload),
            });
        }

        let raw = self
            .graph
            .post_json(&self.messages_path(phone_id), &payload)
            .await?;
        let message_id = raw
            .get("messages")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(SendResult {
            message_id,
            raw: Some(raw),
        })
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    async fn send(&self, to: &str, message: &OutboundMessage) -> GatewayResult<SendResult> {
        let result = self.deliver(to, message).await;
        record_send(message.kind(), Outcome::of(&result));
        match &result {
            Ok(sent) => info!(
                phone = to,
                kind = message.kind(),
                message_id = sent.message_id.as_deref().unwrap_or_default(),
                "whatsapp message sent"
            ),
            Err(err) => warn!(phone = to, kind = message.kind(), error = %err, "whatsapp send failed"),
        }
        result
    }

    async fn upload_media(&self, upload: MediaUpload) -> GatewayResult<String> {
        let phone_id = self.phone_number_id()?;
        if self.graph.is_mock() {
            return Ok(format!("mock-media:{}", upload.filename));
        }

        let part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.mime)
            .map_err(|_| GatewayError::UnsupportedMedia(upload.mime.clone()))?;
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", upload.mime.clone())
            .part("file", part);

        let raw = self
            .graph
            .post_multipart(&format!("{phone_id}/media"), form)
            .await?;
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Decode("media upload response has no id".into()))?;
        info!(filename = %upload.filename, media_id = %id, "uploaded whatsapp media");
        Ok(id)
    }
}
