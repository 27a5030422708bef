use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Serialize;
use tracing::error;
use waflow_bus::BusClient;
use waflow_core::{FlowError, FlowGateway, GatewayError, MessageSender, MessageStore};

use crate::handlers::{flows, messages, send, webhook};

#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<MessageStore>,
    pub sender: Arc<dyn MessageSender>,
    pub flows: Arc<dyn FlowGateway>,
    pub bus: Option<Arc<dyn BusClient>>,
    /// Recorded as `from` on outbound messages in the log.
    pub sender_label: String,
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
}

impl GatewayState {
    pub fn new(
        store: Arc<MessageStore>,
        sender: Arc<dyn MessageSender>,
        flows: Arc<dyn FlowGateway>,
    ) -> Self {
        Self {
            store,
            sender,
            flows,
            bus: None,
            sender_label: "me".into(),
            verify_token: None,
            app_secret: None,
        }
    }

    pub fn with_bus(mut self, bus: Arc<dyn BusClient>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_sender_label(mut self, label: impl Into<String>) -> Self {
        self.sender_label = label.into();
        self
    }

    pub fn with_webhook_secrets(
        mut self,
        verify_token: Option<String>,
        app_secret: Option<String>,
    ) -> Self {
        self.verify_token = verify_token;
        self.app_secret = app_secret;
        self
    }
}

#[derive(Serialize, Debug)]
pub struct ApiError {
    pub error: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);
pub type ApiResult<T> = Result<Json<T>, ApiFailure>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiFailure {
    api_error(StatusCode::BAD_REQUEST, message)
}

/// Maps provider failures onto the status codes the UI understands.
pub fn gateway_failure(err: GatewayError) -> ApiFailure {
    let status = match &err {
        GatewayError::Flow(FlowError::EmptyDocument) => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::InvalidRecipient(_) | GatewayError::UnsupportedMedia(_) => {
            StatusCode::BAD_REQUEST
        }
        GatewayError::UpstreamRejected { .. }
        | GatewayError::Transport(_)
        | GatewayError::Decode(_) => StatusCode::BAD_GATEWAY,
        GatewayError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(code = err.code(), error = %err, "request failed");
    }
    let message = match err {
        GatewayError::UpstreamRejected { message, .. } => message,
        other => other.to_string(),
    };
    api_error(status, message)
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/webhook",
            get(webhook::verify).post(webhook::receive),
        )
        .route(
            "/api/messages",
            get(messages::list).post(messages::record),
        )
        .route("/api/messages/stream", get(messages::stream))
        .route("/api/send-message", post(send::send_message))
        .route("/api/text", post(send::text))
        .route("/api/photo", post(send::photo))
        .route("/api/audio", post(send::audio))
        .route("/api/document", post(send::document))
        .route("/api/sticker", post(send::sticker))
        .route("/api/location", post(send::location))
        .route("/api/contact", post(send::contact))
        .route("/api/send-interactive", post(send::interactive))
        .route("/api/template", post(send::template))
        .route("/api/broadcast", post(send::broadcast))
        .route(
            "/api/flows",
            get(flows::list).post(flows::create).delete(flows::remove_by_body),
        )
        .route("/api/flows/preview", post(flows::preview))
        .route("/api/flows/{id}", delete(flows::remove_by_path))
        .layer(Extension(Arc::new(state)))
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}
