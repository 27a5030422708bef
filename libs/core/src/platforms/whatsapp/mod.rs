//! WhatsApp Business Cloud (Graph) API integration.

pub mod creds;
pub mod flows;
pub mod graph;
pub mod sender;
pub mod webhook;

pub use creds::WhatsAppCredentials;
pub use flows::{
    FlowCategory, FlowCreated, FlowGateway, FlowPreview, FlowStatus, FlowSubmission, FlowSummary,
    FlowValidationError, GraphFlowGateway, publish_document,
};
pub use graph::GraphClient;
pub use sender::WhatsAppSender;
pub use webhook::{
    DeliveryStatus, InboundContent, InboundEvent, InboundMessage, StatusUpdate, VerifyQuery,
    WebhookPayload, extract_events, verify_challenge, verify_signature,
};
