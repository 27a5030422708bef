use std::net::SocketAddr;

use anyhow::{Context, Result};
use waflow_core::WhatsAppCredentials;
use waflow_core::messages::DEFAULT_RETENTION;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub addr: SocketAddr,
    /// Inbound events are relayed to NATS only when set.
    pub nats_url: Option<String>,
    pub retention: usize,
    pub whatsapp: WhatsAppCredentials,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind = non_blank("BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let addr: SocketAddr = bind
            .trim()
            .parse()
            .with_context(|| format!("invalid gateway bind addr `{bind}`"))?;
        let retention = match non_blank("WAFLOW_MESSAGE_RETENTION") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid WAFLOW_MESSAGE_RETENTION `{raw}`"))?,
            None => DEFAULT_RETENTION,
        };

        Ok(Self {
            addr,
            nats_url: non_blank("NATS_URL"),
            retention,
            whatsapp: WhatsAppCredentials::from_lookup(&lookup),
        })
    }
}
