mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use support::{call, get, harness, json_request};
use waflow_core::testkit::load_fixture;
use waflow_core::{BlockKind, FlowCategory, FlowDocument};

fn document() -> FlowDocument {
    let mut doc = FlowDocument::new();
    let block = doc
        .add_block("First_Screen", BlockKind::ShortAnswer)
        .unwrap();
    doc.update_block_label("First_Screen", &block, "Your name");
    doc
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn create_from_document_then_list_and_delete() {
    let h = harness();
    let (status, created) = call(
        &h.router,
        json_request(
            "POST",
            "/api/flows",
            &json!({
                "name": "signup",
                "categories": ["SIGN_UP"],
                "publish": true,
                "document": document(),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], "flow-1");

    let submissions = h.flows.submissions().await;
    assert_eq!(submissions[0].categories, vec![FlowCategory::SignUp]);
    assert!(submissions[0].publish);
    assert_eq!(submissions[0].flow_json["version"], "6.0");

    let (status, listed) = call(&h.router, get("/api/flows")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"][0]["name"], "signup");
    assert_eq!(listed["data"][0]["status"], "PUBLISHED");

    let (status, body) = call(&h.router, delete("/api/flows/flow-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, listed) = call(&h.router, get("/api/flows")).await;
    assert_eq!(listed["data"], json!([]));
}

#[tokio::test]
async fn create_accepts_flow_json_object_or_string() {
    let h = harness();
    let flow_json: Value = load_fixture("libs/core/tests/fixtures/flow_two_screens.json");
    for raw in [flow_json.clone(), Value::String(flow_json.to_string())] {
        let (status, _) = call(
            &h.router,
            json_request("POST", "/api/flows", &json!({ "name": "survey", "flow_json": raw })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let submissions = h.flows.submissions().await;
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].flow_json, submissions[1].flow_json);
    assert_eq!(submissions[0].categories, vec![FlowCategory::Other]);
    assert!(!submissions[0].publish);
}

#[tokio::test]
async fn create_keeps_caller_flow_json_untouched() {
    let h = harness();
    let flow_json = json!({
        "version": "6.0",
        "data_api_version": "3.0",
        "routing_model": { "WELCOME": [] },
        "screens": [{
            "id": "WELCOME",
            "title": "Welcome",
            "terminal": true,
            "data": { "name": { "type": "string", "__example__": "Ana" } },
            "layout": {
                "type": "SingleColumnLayout",
                "children": [{
                    "type": "EmbeddedLink",
                    "text": "Read the terms",
                    "on-click-action": { "name": "data_exchange", "payload": {} }
                }]
            }
        }]
    });
    let (status, _) = call(
        &h.router,
        json_request("POST", "/api/flows", &json!({ "name": "raw", "flow_json": flow_json })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let submissions = h.flows.submissions().await;
    assert_eq!(submissions[0].flow_json, flow_json);
    assert_eq!(submissions[0].flow_json["routing_model"], json!({ "WELCOME": [] }));
    assert_eq!(
        submissions[0].flow_json["screens"][0]["layout"]["children"][0]["type"],
        "EmbeddedLink"
    );
}

#[tokio::test]
async fn create_validates_input() {
    let h = harness();
    for (body, expected) in [
        (json!({ "name": " ", "document": document() }), StatusCode::BAD_REQUEST),
        (json!({ "name": "x" }), StatusCode::BAD_REQUEST),
        (json!({ "name": "x", "flow_json": "not json" }), StatusCode::BAD_REQUEST),
        (json!({ "name": "x", "flow_json": [1, 2] }), StatusCode::BAD_REQUEST),
        (json!({ "name": "x", "flow_json": { "version": "6.0" } }), StatusCode::BAD_REQUEST),
        (
            json!({ "name": "x", "document": { "screens": [] } }),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    ] {
        let (status, _) = call(&h.router, json_request("POST", "/api/flows", &body)).await;
        assert_eq!(status, expected, "{body}");
    }
    assert!(h.flows.submissions().await.is_empty());
}

#[tokio::test]
async fn provider_errors_pass_through() {
    let h = harness();
    h.flows
        .reject_with(400, "Invalid parameter: Flow name already exists")
        .await;
    let (status, body) = call(
        &h.router,
        json_request("POST", "/api/flows", &json!({ "name": "dup", "document": document() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Invalid parameter: Flow name already exists");

    let (status, _) = call(&h.router, get("/api/flows")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn delete_by_body_and_unknown_ids() {
    let h = harness();
    call(
        &h.router,
        json_request("POST", "/api/flows", &json!({ "name": "a", "document": document() })),
    )
    .await;

    let (status, body) = call(&h.router, json_request("DELETE", "/api/flows", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Flow id is required");

    let (status, _) = call(
        &h.router,
        json_request("DELETE", "/api/flows", &json!({ "id": "flow-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&h.router, delete("/api/flows/flow-1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_serializes_and_reports_issues() {
    let h = harness();
    let mut doc = document();
    let dropdown = doc.add_block("First_Screen", BlockKind::Dropdown).unwrap();
    doc.delete_option("First_Screen", &dropdown, 0);
    let (status, body) = call(
        &h.router,
        json_request("POST", "/api/flows/preview", &serde_json::to_value(&doc).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flow_json"]["version"], "6.0");
    assert_eq!(body["flow_json"]["screens"][0]["id"], "First_Screen");
    assert_eq!(body["issues"][0]["kind"], "empty_options");

    let (status, body) = call(
        &h.router,
        json_request("POST", "/api/flows/preview", &json!({ "screens": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "flow document has no screens");
}
