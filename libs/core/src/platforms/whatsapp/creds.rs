use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GatewayError, GatewayResult};

pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_VERSION: &str = "v19.0";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// WhatsApp Cloud API settings. Every secret is optional so that a process
/// missing, say, the business account id can still send messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhatsAppCredentials {
    pub api_token: Option<String>,
    pub phone_number_id: Option<String>,
    pub business_account_id: Option<String>,
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
    pub api_base: String,
    pub graph_version: String,
    #[serde(with = "secs")]
    pub http_timeout: Duration,
}

impl Default for WhatsAppCredentials {
    fn default() -> Self {
        Self {
            api_token: None,
            phone_number_id: None,
            business_account_id: None,
            verify_token: None,
            app_secret: None,
            api_base: DEFAULT_API_BASE.into(),
            graph_version: DEFAULT_GRAPH_VERSION.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl WhatsAppCredentials {
    /// Reads settings through `lookup`, normally `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let http_timeout = match get("WA_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = %raw, "invalid WA_HTTP_TIMEOUT_SECS, using default");
                    Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Self {
            api_token: get("WHATSAPP_API_TOKEN"),
            phone_number_id: get("WHATSAPP_PHONE_NUMBER_ID"),
            business_account_id: get("WHATSAPP_BUSINESS_ACCOUNT_ID"),
            verify_token: get("WHATSAPP_VERIFY_TOKEN"),
            app_secret: get("WHATSAPP_APP_SECRET"),
            api_base: get("WA_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            graph_version: get("WA_GRAPH_VERSION").unwrap_or_else(|| DEFAULT_GRAPH_VERSION.into()),
            http_timeout,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn token(&self) -> GatewayResult<&str> {
        self.api_token
            .as_deref()
            .ok_or(GatewayError::MissingCredential("WHATSAPP_API_TOKEN"))
    }

    pub fn phone_number_id(&self) -> GatewayResult<&str> {
        self.phone_number_id
            .as_deref()
            .ok_or(GatewayError::MissingCredential("WHATSAPP_PHONE_NUMBER_ID"))
    }

    pub fn business_account_id(&self) -> GatewayResult<&str> {
        self.business_account_id
            .as_deref()
            .ok_or(GatewayError::MissingCredential("WHATSAPP_BUSINESS_ACCOUNT_ID"))
    }

    pub fn is_mock(&self) -> bool {
        self.api_base.starts_with("mock://")
    }

    /// Shared HTTP client with the configured request timeout.
    pub fn http_client(&self) -> GatewayResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()?)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let creds = WhatsAppCredentials::from_lookup(|_| None);
        assert_eq!(creds, WhatsAppCredentials::default());
        assert!(matches!(
            creds.token(),
            Err(GatewayError::MissingCredential("WHATSAPP_API_TOKEN"))
        ));
        assert!(!creds.is_mock());
    }

    #[test]
    fn reads_every_setting() {
        let creds = WhatsAppCredentials::from_lookup(lookup(&[
            ("WHATSAPP_API_TOKEN", "tok"),
            ("WHATSAPP_PHONE_NUMBER_ID", "123"),
            ("WHATSAPP_BUSINESS_ACCOUNT_ID", "waba"),
            ("WHATSAPP_VERIFY_TOKEN", "verify"),
            ("WHATSAPP_APP_SECRET", "shh"),
            ("WA_API_BASE", "mock://wa/"),
            ("WA_GRAPH_VERSION", "v21.0"),
            ("WA_HTTP_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(creds.token().unwrap(), "tok");
        assert_eq!(creds.phone_number_id().unwrap(), "123");
        assert_eq!(creds.business_account_id().unwrap(), "waba");
        assert_eq!(creds.verify_token.as_deref(), Some("verify"));
        assert_eq!(creds.app_secret.as_deref(), Some("shh"));
        assert_eq!(creds.api_base, "mock://wa");
        assert!(creds.is_mock());
        assert_eq!(creds.graph_version, "v21.0");
        assert_eq!(creds.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let creds = WhatsAppCredentials::from_lookup(lookup(&[("WHATSAPP_API_TOKEN", "  ")]));
        assert!(creds.api_token.is_none());
    }

    #[test]
    fn bad_timeout_falls_back() {
        let creds = WhatsAppCredentials::from_lookup(lookup(&[("WA_HTTP_TIMEOUT_SECS", "0")]));
        assert_eq!(creds.http_timeout, Duration::from_secs(30));
    }
}
