//! waflow core: the WhatsApp Flow builder and the Cloud API plumbing around it.
//!
//! [`flow::FlowDocument`] is the editable flow definition, [`flow::serialize`]
//! turns it into Flow JSON, and [`platforms::whatsapp`] talks to the Graph API
//! for flows, messages and webhooks. [`messages::MessageStore`] keeps the
//! conversation log that the gateway serves.
pub mod egress;
pub mod error;
pub mod flow;
pub mod messages;
pub mod outbound;
pub mod phone;
pub mod platforms;
#[cfg(feature = "testkit")]
pub mod testkit;

pub use egress::{MediaUpload, MessageSender, SendResult};
pub use error::{FlowError, GatewayError, GatewayResult};
pub use flow::{BlockKind, ContentBlock, FlowDocument, FlowJson, FlowSerializer, Screen};
pub use messages::{MessageStatus, MessageStore, StoreEvent, StoredMessage};
pub use outbound::{MediaKind, OutboundMessage};
pub use platforms::whatsapp::{
    FlowCategory, FlowGateway, GraphFlowGateway, WhatsAppCredentials, WhatsAppSender,
};

/// Returns the semantic version advertised by this crate.
///
/// ```
/// assert_eq!(waflow_core::version(), "0.1.0");
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
