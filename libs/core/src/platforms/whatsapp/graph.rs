//! Thin Graph API transport shared by the message sender and the flow gateway.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::creds::WhatsAppCredentials;
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error_subcode: Option<i64>,
}

#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    api_base: String,
    creds: WhatsAppCredentials,
}

impl GraphClient {
    pub fn new(http: reqwest::Client, creds: &WhatsAppCredentials) -> Self {
        Self {
            http,
            api_base: creds.api_base.trim_end_matches('/').to_string(),
            creds: creds.clone(),
        }
    }

    pub fn creds(&self) -> &WhatsAppCredentials {
        &self.creds
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn is_mock(&self) -> bool {
        self.api_base.starts_with("mock://")
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_base,
            self.creds.graph_version,
            path.trim_start_matches('/')
        )
    }

    pub async fn get(&self, path: &str) -> GatewayResult<Value> {
        let request = self.http.get(self.url(path)).bearer_auth(self.creds.token()?);
        self.execute(path, request).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> GatewayResult<Value> {
        let request = self
            .http
            .post(self.url(path))
            .bearer_auth(self.creds.token()?)
            .json(body);
        self.execute(path, request).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> GatewayResult<Value> {
        let request = self
            .http
            .post(self.url(path))
            .bearer_auth(self.creds.token()?)
            .multipart(form);
        self.execute(path, request).await
    }

    pub async fn delete(&self, path: &str) -> GatewayResult<Value> {
        let request = self.http.delete(self.url(path)).bearer_auth(self.creds.token()?);
        self.execute(path, request).await
    }

    async fn execute(&self, path: &str, request: reqwest::RequestBuilder) -> GatewayResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(path, status = status.as_u16(), "graph response");

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body, path));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| GatewayError::Decode(err.to_string()))
    }
}

/// Maps a failed Graph response to an error, keeping the provider's message verbatim.
///
/// `resource` names what was addressed; it becomes the payload of
/// [`GatewayError::NotFound`] for HTTP 404 or Graph error 100/33.
pub fn rejection(status: u16, body: &str, resource: &str) -> GatewayError {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => {
            let detail = envelope.error;
            if status == 404 || (detail.code == Some(100) && detail.error_subcode == Some(33)) {
                GatewayError::NotFound(resource.to_string())
            } else {
                GatewayError::UpstreamRejected {
                    status,
                    message: detail.message,
                }
            }
        }
        Err(_) if status == 404 => GatewayError::NotFound(resource.to_string()),
        Err(_) => GatewayError::UpstreamRejected {
            status,
            message: body.to_string(),
        },
    }
}
