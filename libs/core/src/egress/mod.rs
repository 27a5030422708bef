use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::GatewayResult;
use crate::outbound::OutboundMessage;

#[derive(Clone, Debug, Default)]
pub struct SendResult {
    /// The wamid assigned by WhatsApp, when the response carried one.
    pub message_id: Option<String>,
    pub raw: Option<Value>,
}

/// A file about to be uploaded to the media endpoint.
#[derive(Clone, Debug)]
pub struct MediaUpload {
    pub filename: String,
    pub mime: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, message: &OutboundMessage) -> GatewayResult<SendResult>;

    /// Uploads media and returns the id to reference in a later send.
    async fn upload_media(&self, upload: MediaUpload) -> GatewayResult<String>;
}
