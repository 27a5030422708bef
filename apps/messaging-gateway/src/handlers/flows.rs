use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Extension, Path},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use waflow_core::flow::{FlowIssue, serialize, validate};
use waflow_core::platforms::whatsapp::{FlowCreated, FlowSubmission, publish_document};
use waflow_core::{FlowCategory, FlowDocument, GatewayError};

use crate::http::{ApiFailure, ApiResult, GatewayState, bad_request, gateway_failure};

/// Either a ready Flow JSON (object or encoded string) or a document to serialize.
#[derive(Debug, Deserialize)]
pub struct CreateFlowRequest {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<FlowCategory>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub flow_json: Option<Value>,
    #[serde(default)]
    pub document: Option<FlowDocument>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFlowRequest {
    #[serde(default)]
    pub id: String,
}

/// Caller JSON is kept opaque; only its shape is checked.
fn parse_flow_json(raw: Value) -> Result<Value, ApiFailure> {
    let parsed = match raw {
        Value::String(encoded) => serde_json::from_str::<Value>(&encoded)
            .map_err(|err| bad_request(format!("invalid flow_json: {err}")))?,
        other => other,
    };
    let has_screens = parsed
        .get("screens")
        .is_some_and(|screens| screens.is_array());
    if !parsed.is_object() || !has_screens {
        return Err(bad_request(
            "invalid flow_json: expected an object with a `screens` array",
        ));
    }
    Ok(parsed)
}

#[debug_handler]
pub async fn list(Extension(state): Extension<Arc<GatewayState>>) -> ApiResult<Value> {
    let flows = state.flows.list().await.map_err(gateway_failure)?;
    Ok(Json(json!({ "data": flows })))
}

#[debug_handler]
pub async fn create(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<CreateFlowRequest>,
) -> ApiResult<FlowCreated> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(bad_request("Flow name is required"));
    }
    let categories = if request.categories.is_empty() {
        vec![FlowCategory::Other]
    } else {
        request.categories
    };

    let created = match (request.document, request.flow_json) {
        (Some(document), _) => {
            publish_document(
                state.flows.as_ref(),
                &name,
                categories,
                request.publish,
                &document,
            )
            .await
        }
        (None, Some(raw)) => {
            let submission = FlowSubmission {
                name: name.clone(),
                categories,
                publish: request.publish,
                flow_json: parse_flow_json(raw)?,
            };
            state.flows.submit(submission).await
        }
        (None, None) => return Err(bad_request("flow_json or document is required")),
    }
    .map_err(gateway_failure)?;

    info!(flow_id = %created.id, %name, "flow created");
    Ok(Json(created))
}

/// Flow JSON for a document plus the problems the provider would reject.
#[debug_handler]
pub async fn preview(Json(document): Json<FlowDocument>) -> ApiResult<Value> {
    let issues: Vec<FlowIssue> = validate(&document);
    let flow_json = serialize(&document).map_err(|err| gateway_failure(GatewayError::from(err)))?;
    Ok(Json(json!({ "flow_json": flow_json, "issues": issues })))
}

#[debug_handler]
pub async fn remove_by_body(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(request): Json<DeleteFlowRequest>,
) -> ApiResult<Value> {
    if request.id.trim().is_empty() {
        return Err(bad_request("Flow id is required"));
    }
    remove(&state, &request.id).await
}

#[debug_handler]
pub async fn remove_by_path(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    remove(&state, &id).await
}

async fn remove(state: &GatewayState, id: &str) -> ApiResult<Value> {
    state.flows.remove(id).await.map_err(gateway_failure)?;
    Ok(Json(json!({ "success": true, "message": "Flow deleted" })))
}
