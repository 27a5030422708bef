//! WhatsApp Flows management on the business account.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use waflow_telemetry::{Outcome, record_flow_op};

use super::creds::WhatsAppCredentials;
use super::graph::GraphClient;
use crate::error::{GatewayError, GatewayResult};
use crate::flow::{FlowDocument, FlowJson, serialize};

const LIST_FIELDS: &str = "id,name,status,categories,validation_errors,preview.invalidate(false)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowCategory {
    SignUp,
    SignIn,
    AppointmentBooking,
    LeadGeneration,
    ContactUs,
    CustomerSupport,
    Survey,
    Other,
    #[serde(other)]
    Unknown,
}

impl FlowCategory {
    pub const ALL: [FlowCategory; 8] = [
        FlowCategory::SignUp,
        FlowCategory::SignIn,
        FlowCategory::AppointmentBooking,
        FlowCategory::LeadGeneration,
        FlowCategory::ContactUs,
        FlowCategory::CustomerSupport,
        FlowCategory::Survey,
        FlowCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowCategory::SignUp => "SIGN_UP",
            FlowCategory::SignIn => "SIGN_IN",
            FlowCategory::AppointmentBooking => "APPOINTMENT_BOOKING",
            FlowCategory::LeadGeneration => "LEAD_GENERATION",
            FlowCategory::ContactUs => "CONTACT_US",
            FlowCategory::CustomerSupport => "CUSTOMER_SUPPORT",
            FlowCategory::Survey => "SURVEY",
            FlowCategory::Other => "OTHER",
            FlowCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FlowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        FlowCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| format!("unknown flow category `{s}`"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStatus {
    Draft,
    Published,
    Deprecated,
    Blocked,
    Throttled,
    #[serde(other)]
    Unknown,
}

/// One problem the provider found in a submitted flow JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowValidationError {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub line_start: Option<u32>,
    #[serde(default)]
    pub line_end: Option<u32>,
    #[serde(default)]
    pub column_start: Option<u32>,
    #[serde(default)]
    pub column_end: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowPreview {
    pub preview_url: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowSummary {
    pub id: String,
    pub name: String,
    pub status: FlowStatus,
    #[serde(default)]
    pub categories: Vec<FlowCategory>,
    #[serde(default)]
    pub validation_errors: Vec<FlowValidationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<FlowPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowCreated {
    pub id: String,
    #[serde(default)]
    pub validation_errors: Vec<FlowValidationError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowSubmission {
    pub name: String,
    pub categories: Vec<FlowCategory>,
    pub publish: bool,
    /// Sent as-is; keys the builder never emits (`routing_model`, screen
    /// `data`, other components) survive untouched.
    pub flow_json: Value,
}

impl FlowSubmission {
    pub fn from_flow_json(
        name: impl Into<String>,
        categories: Vec<FlowCategory>,
        publish: bool,
        flow_json: &FlowJson,
    ) -> GatewayResult<Self> {
        let flow_json =
            serde_json::to_value(flow_json).map_err(|err| GatewayError::Decode(err.to_string()))?;
        Ok(Self {
            name: name.into(),
            categories,
            publish,
            flow_json,
        })
    }

    /// Graph request body; `flow_json` travels as an encoded string.
    pub fn to_body(&self) -> GatewayResult<Value> {
        let flow_json = serde_json::to_string(&self.flow_json)
            .map_err(|err| GatewayError::Decode(err.to_string()))?;
        Ok(json!({
            "name": self.name,
            "categories": self.categories,
            "flow_json": flow_json,
            "publish": self.publish,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct FlowPage {
    #[serde(default)]
    data: Vec<FlowSummary>,
}

/// Provider boundary for flow definitions. One attempt per call, no retry.
#[async_trait]
pub trait FlowGateway: Send + Sync {
    async fn submit(&self, submission: FlowSubmission) -> GatewayResult<FlowCreated>;

    async fn list(&self) -> GatewayResult<Vec<FlowSummary>>;

    async fn remove(&self, id: &str) -> GatewayResult<()>;
}

/// Serializes `document` and submits it. An empty document fails locally
/// with [`crate::FlowError::EmptyDocument`] and never reaches `gateway`.
pub async fn publish_document<G>(
    gateway: &G,
    name: &str,
    categories: Vec<FlowCategory>,
    publish: bool,
    document: &FlowDocument,
) -> GatewayResult<FlowCreated>
where
    G: FlowGateway + ?Sized,
{
    let flow_json = serialize(document)?;
    let submission = FlowSubmission::from_flow_json(name, categories, publish, &flow_json)?;
    gateway.submit(submission).await
}

#[derive(Clone)]
pub struct GraphFlowGateway {
    graph: GraphClient,
}

impl GraphFlowGateway {
    pub fn new(http: reqwest::Client, creds: &WhatsAppCredentials) -> Self {
        Self {
            graph: GraphClient::new(http, creds),
        }
    }

    fn waba(&self) -> GatewayResult<&str> {
        self.graph.creds().business_account_id()
    }

    fn list_path(&self, waba: &str) -> String {
        format!("{waba}/flows?fields={LIST_FIELDS}")
    }
}

#[async_trait]
impl FlowGateway for GraphFlowGateway {
    async fn submit(&self, submission: FlowSubmission) -> GatewayResult<FlowCreated> {
        let result = async {
            let waba = self.waba()?;
            let body = submission.to_body()?;
            let raw = self.graph.post_json(&format!("{waba}/flows"), &body).await?;
            serde_json::from_value::<FlowCreated>(raw)
                .map_err(|err| GatewayError::Decode(err.to_string()))
        }
        .await;
        record_flow_op("submit", Outcome::of(&result));
        match &result {
            Ok(created) => info!(
                flow_id = %created.id,
                name = %submission.name,
                publish = submission.publish,
                validation_errors = created.validation_errors.len(),
                "flow submitted"
            ),
            Err(err) => warn!(name = %submission.name, error = %err, "flow submission failed"),
        }
        result
    }

    async fn list(&self) -> GatewayResult<Vec<FlowSummary>> {
        let result = async {
            let waba = self.waba()?;
            let raw = self.graph.get(&self.list_path(waba)).await?;
            serde_json::from_value::<FlowPage>(raw)
                .map(|page| page.data)
                .map_err(|err| GatewayError::Decode(err.to_string()))
        }
        .await;
        record_flow_op("list", Outcome::of(&result));
        if let Err(err) = &result {
            warn!(error = %err, "listing flows failed");
        }
        result
    }

    async fn remove(&self, id: &str) -> GatewayResult<()> {
        let result = async {
            if id.trim().is_empty() {
                return Err(GatewayError::NotFound(id.to_string()));
            }
            self.graph.delete(id).await.map(|_| ())
        }
        .await;
        record_flow_op("remove", Outcome::of(&result));
        match &result {
            Ok(()) => info!(flow_id = id, "flow deleted"),
            Err(err) => warn!(flow_id = id, error = %err, "flow delete failed"),
        }
        result
    }
}
