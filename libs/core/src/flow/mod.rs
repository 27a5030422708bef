//! Flow builder: the editable [`FlowDocument`], its serializer to WhatsApp Flow
//! JSON, and offline validation.

mod block;
mod document;
pub mod schema;
mod serializer;
mod validate;

pub use block::{BlockKind, ContentBlock, option_id};
pub use document::{DEFAULT_SCREEN_ID, DEFAULT_SCREEN_TITLE, FlowDocument, Screen};
pub use schema::{Component, DataSourceItem, FlowJson, FlowScreen, FooterAction};
pub use serializer::{FlowSerializer, serialize};
pub use validate::{FlowIssue, is_valid_screen_id, validate};
