//! In-memory conversation log with live fan-out to subscribers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::outbound::OutboundMessage;
use crate::phone::same_number;
use crate::platforms::whatsapp::webhook::{DeliveryStatus, InboundMessage};

pub const DEFAULT_RETENTION: usize = 10_000;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
    Received,
    Failed,
}

impl From<DeliveryStatus> for MessageStatus {
    fn from(status: DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Sent => MessageStatus::Sent,
            DeliveryStatus::Delivered => MessageStatus::Delivered,
            DeliveryStatus::Read => MessageStatus::Read,
            DeliveryStatus::Failed => MessageStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Provider message id when known, otherwise a local uuid.
    #[serde(default = "local_id")]
    pub id: String,
    pub content: String,
    pub is_sent: bool,
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub timestamp: OffsetDateTime,
    pub status: MessageStatus,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Media id as delivered by the webhook; resolving it to a URL is left to the reader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

fn local_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl StoredMessage {
    pub fn inbound(message: &InboundMessage) -> Self {
        let media = message.content.media();
        Self {
            id: message.id.clone(),
            content: message.content.summary(),
            is_sent: false,
            timestamp: message.timestamp,
            status: MessageStatus::Received,
            from: message.from.clone(),
            to: message.to.clone(),
            media_type: media.map(|(kind, _)| kind.as_str().to_string()),
            media_url: media.map(|(_, id)| id.to_string()),
        }
    }

    pub fn outbound(
        from: &str,
        to: &str,
        message: &OutboundMessage,
        message_id: Option<String>,
    ) -> Self {
        let media_type = match message {
            OutboundMessage::Media(media) => Some(media.kind.as_str().to_string()),
            _ => None,
        };
        Self {
            id: message_id.unwrap_or_else(local_id),
            content: message.summary(),
            is_sent: true,
            timestamp: OffsetDateTime::now_utc(),
            status: MessageStatus::Sent,
            from: from.to_string(),
            to: to.to_string(),
            media_type,
            media_url: None,
        }
    }

    pub fn involves(&self, phone: &str) -> bool {
        same_number(&self.from, phone) || same_number(&self.to, phone)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    NewMessage { message: StoredMessage },
    StatusUpdated { id: String, status: MessageStatus },
}

/// Process-local message log. Empty after a restart; the oldest entries are
/// dropped once `retention` is exceeded.
pub struct MessageStore {
    messages: RwLock<VecDeque<StoredMessage>>,
    retention: usize,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            messages: RwLock::new(VecDeque::new()),
            retention: retention.max(1),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn add(&self, message: StoredMessage) {
        {
            let mut guard = self.messages.write().await;
            guard.push_back(message.clone());
            while guard.len() > self.retention {
                guard.pop_front();
            }
        }
        debug!(id = %message.id, sent = message.is_sent, "stored message");
        // No subscribers is fine.
        let _ = self.events.send(StoreEvent::NewMessage { message });
    }

    /// Messages in arrival order; with `phone`, only those sent from or to it.
    pub async fn list(&self, phone: Option<&str>) -> Vec<StoredMessage> {
        let guard = self.messages.read().await;
        match phone.filter(|p| !p.trim().is_empty()) {
            Some(phone) => guard.iter().filter(|m| m.involves(phone)).cloned().collect(),
            None => guard.iter().cloned().collect(),
        }
    }

    /// Returns false when no stored message has `id`.
    pub async fn update_status(&self, id: &str, status: MessageStatus) -> bool {
        let found = {
            let mut guard = self.messages.write().await;
            match guard.iter_mut().rev().find(|m| m.id == id) {
                Some(message) => {
                    message.status = status;
                    true
                }
                None => false,
            }
        };
        if found {
            let _ = self.events.send(StoreEvent::StatusUpdated {
                id: id.to_string(),
                status,
            });
        }
        found
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}
