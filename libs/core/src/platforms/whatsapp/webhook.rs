//! Webhook verification and parsing of `whatsapp_business_account` callbacks.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use tracing::debug;

use crate::outbound::MediaKind;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// Query string of the subscription handshake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub token: Option<String>,
}

/// Returns the challenge to echo when the handshake matches `expected_token`.
/// An unset token never verifies.
pub fn verify_challenge(query: &VerifyQuery, expected_token: Option<&str>) -> Option<String> {
    let expected = expected_token?;
    let token = query.token.as_deref()?;
    let matches: bool = token.as_bytes().ct_eq(expected.as_bytes()).into();
    (query.mode.as_deref() == Some("subscribe") && matches)
        .then(|| query.challenge.clone().unwrap_or_default())
}

fn mac_hex(app_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks an `X-Hub-Signature-256: sha256=<hex>` header against the raw body.
pub fn verify_signature(app_secret: &str, header: Option<&str>, body: &[u8]) -> bool {
    let Some(provided) = header.and_then(|sig| sig.strip_prefix("sha256=")) else {
        return false;
    };
    let Some(expected) = mac_hex(app_secret, body) else {
        return false;
    };
    provided
        .to_ascii_lowercase()
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into()
}

/// Header value WhatsApp would send for `body`.
pub fn sign_body(app_secret: &str, body: &[u8]) -> Option<String> {
    mac_hex(app_secret, body).map(|hex| format!("sha256={hex}"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<WaMessage>,
    #[serde(default)]
    pub statuses: Vec<WaStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<WaText>,
    #[serde(default)]
    pub image: Option<WaMedia>,
    #[serde(default)]
    pub audio: Option<WaMedia>,
    #[serde(default)]
    pub video: Option<WaMedia>,
    #[serde(default)]
    pub document: Option<WaMedia>,
    #[serde(default)]
    pub sticker: Option<WaMedia>,
    #[serde(default)]
    pub location: Option<WaLocation>,
    #[serde(default)]
    pub interactive: Option<WaInteractive>,
    #[serde(default)]
    pub button: Option<WaButton>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaText {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaMedia {
    pub id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaReply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaFlowReply {
    #[serde(default)]
    pub response_json: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaInteractive {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub list_reply: Option<WaReply>,
    #[serde(default)]
    pub button_reply: Option<WaReply>,
    #[serde(default)]
    pub nfm_reply: Option<WaFlowReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaButton {
    #[serde(default)]
    pub payload: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub errors: Vec<WaStatusError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaStatusError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundContent {
    Text {
        body: String,
    },
    Media {
        kind: MediaKind,
        id: String,
        caption: Option<String>,
        mime_type: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    },
    ListReply {
        id: String,
        title: String,
    },
    ButtonReply {
        id: String,
        title: String,
    },
    /// A completed flow; `response` is the decoded `response_json`.
    FlowReply {
        response: Value,
    },
}

impl InboundContent {
    /// Text shown in the conversation view.
    pub fn summary(&self) -> String {
        match self {
            InboundContent::Text { body } => body.clone(),
            InboundContent::Media { kind, caption, .. } => caption
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| format!("[{}]", kind.as_str())),
            InboundContent::Location {
                latitude,
                longitude,
                name,
            } => match name {
                Some(name) => format!("[location {name} {latitude},{longitude}]"),
                None => format!("[location {latitude},{longitude}]"),
            },
            InboundContent::ListReply { title, .. } | InboundContent::ButtonReply { title, .. } => {
                title.clone()
            }
            InboundContent::FlowReply { .. } => "[flow response]".into(),
        }
    }

    pub fn media(&self) -> Option<(MediaKind, &str)> {
        match self {
            InboundContent::Media { kind, id, .. } => Some((*kind, id.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    /// Business display number the message was sent to.
    pub to: String,
    pub phone_number_id: String,
    pub profile_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub content: InboundContent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    /// Anything the provider reports beyond sent/delivered/read counts as failed.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "sent" => DeliveryStatus::Sent,
            "delivered" => DeliveryStatus::Delivered,
            "read" => DeliveryStatus::Read,
            _ => DeliveryStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusUpdate {
    pub message_id: String,
    pub recipient: String,
    pub phone_number_id: String,
    pub status: DeliveryStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(InboundMessage),
    Status(StatusUpdate),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::Status(_) => "status",
        }
    }
}

fn parse_timestamp(raw: &str) -> OffsetDateTime {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
}

fn media_content(kind: MediaKind, media: Option<&WaMedia>) -> Option<InboundContent> {
    let media = media?;
    Some(InboundContent::Media {
        kind,
        id: media.id.clone(),
        caption: media.caption.clone(),
        mime_type: media.mime_type.clone(),
    })
}

fn message_content(message: &WaMessage) -> Option<InboundContent> {
    match message.kind.as_str() {
        "text" => message.text.as_ref().map(|text| InboundContent::Text {
            body: text.body.clone(),
        }),
        "image" => media_content(MediaKind::Image, message.image.as_ref()),
        "audio" => media_content(MediaKind::Audio, message.audio.as_ref()),
        "video" => media_content(MediaKind::Video, message.video.as_ref()),
        "document" => media_content(MediaKind::Document, message.document.as_ref()),
        "sticker" => media_content(MediaKind::Sticker, message.sticker.as_ref()),
        "location" => message
            .location
            .as_ref()
            .map(|loc| InboundContent::Location {
                latitude: loc.latitude,
                longitude: loc.longitude,
                name: loc.name.clone(),
            }),
        "button" => message.button.as_ref().map(|button| InboundContent::ButtonReply {
            id: button.payload.clone(),
            title: button.text.clone(),
        }),
        "interactive" => {
            let interactive = message.interactive.as_ref()?;
            match interactive.kind.as_str() {
                "list_reply" => interactive.list_reply.as_ref().map(|reply| {
                    InboundContent::ListReply {
                        id: reply.id.clone(),
                        title: reply.title.clone(),
                    }
                }),
                "button_reply" => interactive.button_reply.as_ref().map(|reply| {
                    InboundContent::ButtonReply {
                        id: reply.id.clone(),
                        title: reply.title.clone(),
                    }
                }),
                "nfm_reply" => interactive.nfm_reply.as_ref().map(|reply| {
                    let response = serde_json::from_str(&reply.response_json)
                        .unwrap_or_else(|_| Value::String(reply.response_json.clone()));
                    InboundContent::FlowReply { response }
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Flattens a webhook callback into events. Payloads for other objects, fields
/// other than `messages`, and message types without a mapping are skipped.
pub fn extract_events(payload: &WebhookPayload) -> Vec<InboundEvent> {
    let mut out = Vec::new();
    if payload.object != BUSINESS_ACCOUNT_OBJECT {
        debug!(object = %payload.object, "ignoring webhook for foreign object");
        return out;
    }

    for change in payload.entry.iter().flat_map(|entry| &entry.changes) {
        if change.field != "messages" {
            continue;
        }
        let value = &change.value;
        let metadata = value.metadata.clone().unwrap_or_default();

        for message in &value.messages {
            let Some(content) = message_content(message) else {
                debug!(kind = %message.kind, from = %message.from, "unsupported message type");
                continue;
            };
            let profile_name = value
                .contacts
                .iter()
                .find(|contact| contact.wa_id == message.from)
                .or_else(|| value.contacts.first())
                .and_then(|contact| contact.profile.as_ref())
                .map(|profile| profile.name.clone());
            out.push(InboundEvent::Message(InboundMessage {
                id: message.id.clone(),
                from: message.from.clone(),
                to: metadata.display_phone_number.clone(),
                phone_number_id: metadata.phone_number_id.clone(),
                profile_name,
                timestamp: parse_timestamp(&message.timestamp),
                content,
            }));
        }

        for status in &value.statuses {
            out.push(InboundEvent::Status(StatusUpdate {
                message_id: status.id.clone(),
                recipient: status.recipient_id.clone(),
                phone_number_id: metadata.phone_number_id.clone(),
                status: DeliveryStatus::parse(&status.status),
                timestamp: parse_timestamp(&status.timestamp),
                error: status.errors.first().map(|err| match err.code {
                    Some(code) => format!("{code}: {}", err.title),
                    None => err.title.clone(),
                }),
            }));
        }
    }
    out
}
