//! Test doubles and fixture helpers, enabled with the `testkit` feature.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::egress::{MediaUpload, MessageSender, SendResult};
use crate::error::{GatewayError, GatewayResult};
use crate::outbound::OutboundMessage;
use crate::platforms::whatsapp::flows::{
    FlowCreated, FlowGateway, FlowStatus, FlowSubmission, FlowSummary,
};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("workspace root")
        .to_path_buf()
}

/// Loads a JSON fixture relative to the workspace root.
pub fn load_fixture(path: impl AsRef<Path>) -> Value {
    let full = workspace_root().join(path.as_ref());
    let content = fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", full.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|err| panic!("invalid json in {}: {err}", full.display()))
}

/// Flow gateway backed by memory. Ids are `flow-<n>`.
#[derive(Default)]
pub struct InMemoryFlowGateway {
    flows: Mutex<Vec<FlowSummary>>,
    submissions: Mutex<Vec<FlowSubmission>>,
    rejection: Mutex<Option<(u16, String)>>,
    next_id: AtomicU64,
}

impl InMemoryFlowGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following call fails as if the provider answered `status` with `message`.
    pub async fn reject_with(&self, status: u16, message: impl Into<String>) {
        *self.rejection.lock().await = Some((status, message.into()));
    }

    pub async fn submissions(&self) -> Vec<FlowSubmission> {
        self.submissions.lock().await.clone()
    }

    async fn check(&self) -> GatewayResult<()> {
        match self.rejection.lock().await.clone() {
            Some((status, message)) => Err(GatewayError::UpstreamRejected { status, message }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FlowGateway for InMemoryFlowGateway {
    async fn submit(&self, submission: FlowSubmission) -> GatewayResult<FlowCreated> {
        self.check().await?;
        let id = format!("flow-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.flows.lock().await.push(FlowSummary {
            id: id.clone(),
            name: submission.name.clone(),
            status: if submission.publish {
                FlowStatus::Published
            } else {
                FlowStatus::Draft
            },
            categories: submission.categories.clone(),
            validation_errors: Vec::new(),
            preview: None,
        });
        self.submissions.lock().await.push(submission);
        Ok(FlowCreated {
            id,
            validation_errors: Vec::new(),
        })
    }

    async fn list(&self) -> GatewayResult<Vec<FlowSummary>> {
        self.check().await?;
        Ok(self.flows.lock().await.clone())
    }

    async fn remove(&self, id: &str) -> GatewayResult<()> {
        self.check().await?;
        let mut flows = self.flows.lock().await;
        let before = flows.len();
        flows.retain(|flow| flow.id != id);
        if flows.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Sender that records what it was asked to deliver.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    uploads: Mutex<Vec<MediaUpload>>,
    failing: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `to` fail with an upstream rejection.
    pub async fn fail_for(&self, to: impl Into<String>) {
        self.failing.lock().await.insert(to.into());
    }

    pub async fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn uploads(&self) -> Vec<MediaUpload> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, to: &str, message: &OutboundMessage) -> GatewayResult<SendResult> {
        if self.failing.lock().await.contains(to) {
            return Err(GatewayError::UpstreamRejected {
                status: 400,
                message: format!("recipient {to} rejected"),
            });
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), message.clone()));
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SendResult {
            message_id: Some(format!("wamid.test.{n}")),
            raw: Some(message.to_payload(to)),
        })
    }

    async fn upload_media(&self, upload: MediaUpload) -> GatewayResult<String> {
        let id = format!("media-{}", upload.filename);
        self.uploads.lock().await.push(upload);
        Ok(id)
    }
}
