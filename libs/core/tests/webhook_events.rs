#![cfg(feature = "testkit")]

use waflow_core::messages::{MessageStatus, MessageStore, StoredMessage};
use waflow_core::platforms::whatsapp::webhook::{
    DeliveryStatus, InboundContent, InboundEvent, WebhookPayload, extract_events,
};
use waflow_core::testkit::load_fixture;
use waflow_core::{MediaKind, OutboundMessage};

fn payload(name: &str) -> WebhookPayload {
    serde_json::from_value(load_fixture(format!("libs/core/tests/fixtures/{name}"))).unwrap()
}

#[test]
fn text_and_media_messages() {
    let events = extract_events(&payload("webhook_text_message.json"));
    assert_eq!(events.len(), 2);

    let InboundEvent::Message(text) = &events[0] else {
        panic!("expected message, got {:?}", events[0]);
    };
    assert_eq!(text.from, "16505551234");
    assert_eq!(text.to, "15550783881");
    assert_eq!(text.phone_number_id, "106540352242922");
    assert_eq!(text.profile_name.as_deref(), Some("Sheena Nelson"));
    assert_eq!(text.timestamp.unix_timestamp(), 1_749_416_383);
    assert_eq!(
        text.content,
        InboundContent::Text {
            body: "Does it come in another color?".into()
        }
    );

    let InboundEvent::Message(image) = &events[1] else {
        panic!("expected message, got {:?}", events[1]);
    };
    assert_eq!(image.content.media(), Some((MediaKind::Image, "1003383421387256")));
    assert_eq!(image.content.summary(), "this one");
}

#[test]
fn status_updates() {
    let events = extract_events(&payload("webhook_status.json"));
    let statuses: Vec<_> = events
        .iter()
        .map(|event| match event {
            InboundEvent::Status(status) => (status.message_id.as_str(), status.status),
            other => panic!("expected status, got {other:?}"),
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("wamid.test.1", DeliveryStatus::Read),
            ("wamid.test.2", DeliveryStatus::Failed)
        ]
    );
    let InboundEvent::Status(failed) = &events[1] else {
        unreachable!()
    };
    assert_eq!(failed.error.as_deref(), Some("131026: Message undeliverable"));
}

#[tokio::test]
async fn webhook_events_drive_the_store() {
    let store = MessageStore::new();
    store
        .add(StoredMessage::outbound(
            "15550783881",
            "16505551234",
            &OutboundMessage::text("hello"),
            Some("wamid.test.1".into()),
        ))
        .await;

    for event in extract_events(&payload("webhook_text_message.json"))
        .into_iter()
        .chain(extract_events(&payload("webhook_status.json")))
    {
        match event {
            InboundEvent::Message(message) => store.add(StoredMessage::inbound(&message)).await,
            InboundEvent::Status(status) => {
                store
                    .update_status(&status.message_id, status.status.into())
                    .await;
            }
        }
    }

    let conversation = store.list(Some("+16505551234")).await;
    assert_eq!(conversation.len(), 3);
    assert_eq!(conversation[0].status, MessageStatus::Read);
    assert!(conversation[0].is_sent);
    assert_eq!(conversation[1].status, MessageStatus::Received);
    assert_eq!(conversation[2].media_type.as_deref(), Some("image"));
    assert_eq!(conversation[2].media_url.as_deref(), Some("1003383421387256"));
}
