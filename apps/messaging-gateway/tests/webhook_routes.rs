mod support;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::json;
use support::{call, call_text, get, harness, harness_with, json_request};
use tower::ServiceExt;
use waflow_core::platforms::whatsapp::webhook::{SIGNATURE_HEADER, sign_body};
use waflow_core::testkit::load_fixture;
use waflow_core::{MessageStatus, OutboundMessage, StoredMessage};

fn fixture_bytes(name: &str) -> Vec<u8> {
    serde_json::to_vec(&load_fixture(format!("libs/core/tests/fixtures/{name}"))).unwrap()
}

fn webhook_post(body: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn healthz_has_no_content() {
    let h = harness();
    let (status, body) = call(&h.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn handshake_echoes_challenge_only_for_matching_token() {
    let h = harness_with(|state| state.with_webhook_secrets(Some("verify-me".into()), None));

    let (status, text) = call_text(
        &h.router,
        get("/api/webhook?hub.mode=subscribe&hub.challenge=1158201444&hub.verify_token=verify-me"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "1158201444");

    let (status, body) = call(
        &h.router,
        get("/api/webhook?hub.mode=subscribe&hub.challenge=1&hub.verify_token=wrong"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Verification failed" }));
}

#[tokio::test]
async fn handshake_fails_without_configured_token() {
    let h = harness();
    let (status, _) = call(
        &h.router,
        get("/api/webhook?hub.mode=subscribe&hub.challenge=1&hub.verify_token=anything"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inbound_messages_are_stored_and_relayed() {
    let h = harness();
    let (status, body) = call(
        &h.router,
        webhook_post(fixture_bytes("webhook_text_message.json"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let stored = h.store.list(Some("+16505551234")).await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|m| !m.is_sent));
    assert_eq!(stored[0].content, "Does it come in another color?");
    assert_eq!(stored[1].media_type.as_deref(), Some("image"));
    assert_eq!(stored[1].media_url.as_deref(), Some("1003383421387256"));

    let published = h.bus.take_published().await;
    assert_eq!(published.len(), 2);
    assert_eq!(
        published[0].0,
        "waflow.whatsapp.in.106540352242922.16505551234"
    );
    assert_eq!(published[0].1["event"], "message");
}

#[tokio::test]
async fn status_updates_change_stored_messages() {
    let h = harness();
    h.store
        .add(StoredMessage::outbound(
            "106540352242922",
            "16505551234",
            &OutboundMessage::text("hello"),
            Some("wamid.test.1".into()),
        ))
        .await;

    let (status, _) = call(
        &h.router,
        webhook_post(fixture_bytes("webhook_status.json"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = h.store.list(None).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, MessageStatus::Read);

    let subjects: Vec<_> = h
        .bus
        .take_published()
        .await
        .into_iter()
        .map(|(subject, _)| subject)
        .collect();
    assert_eq!(
        subjects,
        vec![
            "waflow.whatsapp.status.106540352242922",
            "waflow.whatsapp.status.106540352242922"
        ]
    );
}

#[tokio::test]
async fn signature_is_enforced_when_app_secret_is_set() {
    let h = harness_with(|state| state.with_webhook_secrets(None, Some("app-secret".into())));
    let body = fixture_bytes("webhook_text_message.json");

    let (status, _) = call(&h.router, webhook_post(body.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &h.router,
        webhook_post(body.clone(), Some("sha256=deadbeef".into())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.store.is_empty().await);

    let signature = sign_body("app-secret", &body);
    let (status, _) = call(&h.router, webhook_post(body, signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.store.len().await, 2);
}

#[tokio::test]
async fn malformed_webhook_is_a_bad_request() {
    let h = harness();
    let (status, body) = call(&h.router, webhook_post(b"{not json".to_vec(), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid webhook payload"));
}

#[tokio::test]
async fn other_objects_are_acknowledged_and_ignored() {
    let h = harness();
    let body = serde_json::to_vec(&json!({ "object": "page", "entry": [] })).unwrap();
    let (status, _) = call(&h.router, webhook_post(body, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.store.is_empty().await);
    assert!(h.bus.take_published().await.is_empty());
}

#[tokio::test]
async fn messages_can_be_recorded_and_filtered() {
    let h = harness();
    for (content, to) in [("first", "+491701234567"), ("second", "+15550001111")] {
        let (status, _) = call(
            &h.router,
            json_request(
                "POST",
                "/api/messages",
                &json!({ "content": content, "isSent": true, "status": "sent", "to": to }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, all) = call(&h.router, get("/api/messages")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, filtered) = call(&h.router, get("/api/messages?phone=491701234567")).await;
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["content"], "first");
    assert_eq!(filtered[0]["isSent"], true);
}

#[tokio::test]
async fn stream_pushes_new_messages() {
    let h = harness();
    let response = h
        .router
        .clone()
        .oneshot(get("/api/messages/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    h.store
        .add(StoredMessage::outbound(
            "me",
            "16505551234",
            &OutboundMessage::text("live"),
            Some("wamid.live".into()),
        ))
        .await;

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("event before timeout")
        .expect("stream open")
        .unwrap();
    let data = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(data.starts_with("data: "));
    assert!(data.contains("\"type\":\"newMessage\""));
    assert!(data.contains("wamid.live"));
}
