use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Extension, Multipart, multipart::MultipartError},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use waflow_core::outbound::{InteractiveList, MediaMessage, TemplateMessage, parse_coordinates};
use waflow_core::phone::{
    MAX_BROADCAST_RECIPIENTS, digits, format_phone_number, is_valid_phone_number,
    truncate_message,
};
use waflow_core::{MediaKind, MediaUpload, OutboundMessage, SendResult, StoredMessage};

use crate::http::{ApiFailure, ApiResult, GatewayState, api_error, bad_request, gateway_failure};

const DEFAULT_BROADCAST_TEXT: &str = "Hello! This is a test message from broadcast service.";

/// Body of the single-purpose send endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleSend {
    pub phone_number: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractiveRequest {
    pub phone: String,
    #[serde(default)]
    pub list: Option<InteractiveList>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub phone: String,
    #[serde(default)]
    pub template: Option<TemplateMessage>,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub numbers: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastOutcome {
    pub phone: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Graph recipient for user input: digits of a valid E.164 number.
fn recipient(raw: &str) -> Result<String, ApiFailure> {
    if raw.trim().is_empty() {
        return Err(bad_request("Phone number is required"));
    }
    let formatted = format_phone_number(raw);
    if !is_valid_phone_number(&formatted) {
        return Err(bad_request(format!("Invalid phone number `{raw}`")));
    }
    Ok(digits(&formatted))
}

async fn deliver(
    state: &GatewayState,
    to: &str,
    message: OutboundMessage,
) -> Result<SendResult, ApiFailure> {
    let result = state
        .sender
        .send(to, &message)
        .await
        .map_err(gateway_failure)?;
    state
        .store
        .add(StoredMessage::outbound(
            &state.sender_label,
            to,
            &message,
            result.message_id.clone(),
        ))
        .await;
    Ok(result)
}

fn sent(result: SendResult) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Message sent successfully!",
        "messageId": result.message_id,
    }))
}

async fn send_simple<F>(state: &GatewayState, request: SimpleSend, build: F) -> ApiResult<Value>
where
    F: FnOnce(&str) -> Result<OutboundMessage, ApiFailure>,
{
    let to = recipient(&request.phone_number)?;
    let content = request.content.trim();
    if content.is_empty() {
        return Err(bad_request("Content is required"));
    }
    let message = build(content)?;
    deliver(state, &to, message).await.map(sent)
}

fn media_link(kind: MediaKind) -> impl FnOnce(&str) -> Result<OutboundMessage, ApiFailure> {
    move |url: &str| Ok(OutboundMessage::Media(MediaMessage::link(kind, url)))
}

#[debug_handler]
pub async fn text(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, |body| {
        Ok(OutboundMessage::text(truncate_message(body)))
    })
    .await
}

#[debug_handler]
pub async fn photo(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, media_link(MediaKind::Image)).await
}

#[debug_handler]
pub async fn audio(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, media_link(MediaKind::Audio)).await
}

#[debug_handler]
pub async fn document(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, media_link(MediaKind::Document)).await
}

#[debug_handler]
pub async fn sticker(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, media_link(MediaKind::Sticker)).await
}

#[debug_handler]
pub async fn location(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, |raw| {
        let (latitude, longitude) = parse_coordinates(raw)
            .ok_or_else(|| bad_request("Location must be `<latitude>,<longitude>`"))?;
        Ok(OutboundMessage::Location {
            latitude,
            longitude,
        })
    })
    .await
}

/// `content` is a vCard.
#[debug_handler]
pub async fn contact(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<SimpleSend>,
) -> ApiResult<Value> {
    send_simple(&state, request, |vcard| {
        Ok(OutboundMessage::Contacts {
            vcard: vcard.to_string(),
        })
    })
    .await
}

#[debug_handler]
pub async fn interactive(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<InteractiveRequest>,
) -> ApiResult<Value> {
    let to = recipient(&request.phone)?;
    let list = request.list.unwrap_or_else(InteractiveList::main_menu);
    deliver(&state, &to, OutboundMessage::Interactive(list))
        .await
        .map(sent)
}

#[debug_handler]
pub async fn template(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<TemplateRequest>,
) -> ApiResult<Value> {
    let to = recipient(&request.phone)?;
    let template = request.template.unwrap_or_else(TemplateMessage::flow_form);
    deliver(&state, &to, OutboundMessage::Template(template))
        .await
        .map(sent)
}

fn multipart_failure(err: MultipartError) -> ApiFailure {
    api_error(err.status(), err.body_text())
}

/// Form fields `phone`, `message` and an optional `file`. A file is uploaded
/// first and sent as media with `message` as its caption.
#[debug_handler]
pub async fn send_message(
    Extension(state): Extension<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    let mut phone = None;
    let mut text = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "phone" => phone = Some(field.text().await.map_err(multipart_failure)?),
            "message" => text = Some(field.text().await.map_err(multipart_failure)?),
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_failure)?;
                if !bytes.is_empty() {
                    file = Some(MediaUpload {
                        filename,
                        mime,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }

    let (Some(phone), Some(text)) = (phone, text) else {
        return Err(bad_request("Phone and message are required"));
    };
    let to = recipient(&phone)?;

    let message = match file {
        Some(upload) => {
            let kind = MediaKind::from_mime(&upload.mime)
                .ok_or_else(|| bad_request(format!("Unsupported file type: {}", upload.mime)))?;
            let filename = upload.filename.clone();
            let media_id = state
                .sender
                .upload_media(upload)
                .await
                .map_err(gateway_failure)?;
            info!(%media_id, kind = kind.as_str(), "media uploaded");
            OutboundMessage::Media(
                MediaMessage::uploaded(kind, media_id)
                    .with_caption(text)
                    .with_filename(filename),
            )
        }
        None => {
            if text.trim().is_empty() {
                return Err(bad_request("Phone and message are required"));
            }
            OutboundMessage::text(truncate_message(&text))
        }
    };

    deliver(&state, &to, message).await.map(sent)
}

/// Sends one text to every number in turn; one failure does not stop the rest.
#[debug_handler]
pub async fn broadcast(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<BroadcastRequest>,
) -> ApiResult<Value> {
    if request.numbers.is_empty() {
        return Err(bad_request("At least one phone number is required"));
    }
    if request.numbers.len() > MAX_BROADCAST_RECIPIENTS {
        return Err(bad_request(format!(
            "Maximum {MAX_BROADCAST_RECIPIENTS} phone numbers allowed"
        )));
    }
    let text = request
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BROADCAST_TEXT.to_string());
    let message = OutboundMessage::text(truncate_message(&text));

    let mut results = Vec::with_capacity(request.numbers.len());
    for phone in request.numbers {
        let outcome = match recipient(&phone) {
            Ok(to) => deliver(&state, &to, message.clone()).await,
            Err(err) => Err(err),
        };
        results.push(match outcome {
            Ok(result) => BroadcastOutcome {
                phone,
                success: true,
                message_id: result.message_id,
                error: None,
            },
            Err((_, Json(err))) => {
                warn!(%phone, error = %err.error, "broadcast send failed");
                BroadcastOutcome {
                    phone,
                    success: false,
                    message_id: None,
                    error: Some(err.error),
                }
            }
        });
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;
    info!(succeeded, failed, "broadcast finished");
    Ok(Json(json!({
        "success": failed == 0,
        "sent": succeeded,
        "failed": failed,
        "results": results,
    })))
}
