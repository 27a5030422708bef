#![cfg(feature = "testkit")]

use serde_json::Value;
use waflow_core::flow::{BlockKind, FlowDocument};
use waflow_core::platforms::whatsapp::flows::{
    FlowCategory, FlowGateway, FlowStatus, FlowSummary, publish_document,
};
use waflow_core::testkit::{InMemoryFlowGateway, load_fixture};
use waflow_core::{FlowError, GatewayError};

fn document() -> FlowDocument {
    let mut doc = FlowDocument::new();
    doc.add_block("First_Screen", BlockKind::ShortAnswer);
    doc
}

#[tokio::test]
async fn empty_document_never_reaches_the_gateway() {
    let gateway = InMemoryFlowGateway::new();
    let err = publish_document(
        &gateway,
        "empty",
        vec![FlowCategory::Other],
        false,
        &FlowDocument::from_screens(Vec::new()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GatewayError::Flow(FlowError::EmptyDocument)));
    assert!(gateway.submissions().await.is_empty());
}

#[tokio::test]
async fn submit_list_remove() {
    let gateway = InMemoryFlowGateway::new();
    let created = publish_document(&gateway, "signup", vec![FlowCategory::SignUp], true, &document())
        .await
        .unwrap();
    assert_eq!(created.id, "flow-1");

    let submitted = gateway.submissions().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].flow_json["version"], "6.0");

    let flows = gateway.list().await.unwrap();
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0].status, FlowStatus::Published);

    gateway.remove("flow-1").await.unwrap();
    assert!(gateway.list().await.unwrap().is_empty());
    assert!(matches!(
        gateway.remove("flow-1").await,
        Err(GatewayError::NotFound(id)) if id == "flow-1"
    ));
}

#[tokio::test]
async fn provider_rejection_is_surfaced_verbatim() {
    let gateway = InMemoryFlowGateway::new();
    gateway
        .reject_with(400, "Invalid Flow JSON: screen id must be unique")
        .await;
    let err = publish_document(&gateway, "x", vec![FlowCategory::Other], false, &document())
        .await
        .unwrap_err();
    match err {
        GatewayError::UpstreamRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid Flow JSON: screen id must be unique");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn graph_list_response_parses() {
    let value = load_fixture("libs/core/tests/fixtures/graph_flows_list.json");
    let flows: Vec<FlowSummary> =
        serde_json::from_value(value.get("data").cloned().unwrap_or(Value::Null)).unwrap();
    assert_eq!(flows.len(), 2);
    assert_eq!(flows[0].categories, vec![FlowCategory::AppointmentBooking]);
    assert!(flows[0].preview.as_ref().unwrap().preview_url.contains("/preview/"));
    assert_eq!(flows[1].status, FlowStatus::Published);
    assert_eq!(flows[1].validation_errors[0].error, "INVALID_PROPERTY_VALUE");
    assert_eq!(flows[1].validation_errors[0].line_start, Some(10));
}
