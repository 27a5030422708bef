#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use waflow_core::MessageStore;
use waflow_core::testkit::{InMemoryFlowGateway, RecordingSender};
use waflow_gateway::{GatewayState, InMemoryBusClient, build_router};

pub struct Harness {
    pub router: Router,
    pub store: Arc<MessageStore>,
    pub sender: Arc<RecordingSender>,
    pub flows: Arc<InMemoryFlowGateway>,
    pub bus: InMemoryBusClient,
}

pub fn harness() -> Harness {
    harness_with(|state| state)
}

pub fn harness_with(configure: impl FnOnce(GatewayState) -> GatewayState) -> Harness {
    let store = Arc::new(MessageStore::new());
    let sender = Arc::new(RecordingSender::new());
    let flows = Arc::new(InMemoryFlowGateway::new());
    let bus = InMemoryBusClient::default();
    let state = GatewayState::new(store.clone(), sender.clone(), flows.clone())
        .with_bus(Arc::new(bus.clone()))
        .with_sender_label("106540352242922");
    Harness {
        router: build_router(configure(state)),
        store,
        sender,
        flows,
        bus,
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn call_text(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, text) = call_text(router, request).await;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, body)
}
