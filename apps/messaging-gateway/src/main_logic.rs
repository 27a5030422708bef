use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{info, warn};
use waflow_bus::{BusClient, NatsBusClient};
use waflow_core::{GraphFlowGateway, MessageStore, WhatsAppSender};

use crate::config::GatewayConfig;
use crate::http::{GatewayState, build_router};

/// Wires the WhatsApp clients into the router. Connects to NATS when configured.
pub async fn build_state(config: &GatewayConfig) -> Result<GatewayState> {
    let creds = &config.whatsapp;
    let http = creds
        .http_client()
        .context("failed to build whatsapp http client")?;
    if creds.is_mock() {
        warn!(api_base = %creds.api_base, "whatsapp api is mocked; nothing leaves this process");
    }

    let store = Arc::new(MessageStore::with_retention(config.retention));
    let sender = Arc::new(WhatsAppSender::new(http.clone(), creds));
    let flows = Arc::new(GraphFlowGateway::new(http, creds));

    let mut state = GatewayState::new(store, sender, flows).with_webhook_secrets(
        creds.verify_token.clone(),
        creds.app_secret.clone(),
    );
    if let Some(phone_number_id) = &creds.phone_number_id {
        state = state.with_sender_label(phone_number_id.clone());
    }
    if let Some(url) = &config.nats_url {
        let bus: Arc<dyn BusClient> = Arc::new(NatsBusClient::connect(url).await?);
        state = state.with_bus(bus);
    }
    Ok(state)
}

/// Starts the gateway HTTP server using the provided configuration.
pub async fn run(config: GatewayConfig) -> Result<()> {
    let router = build_router(build_state(&config).await?);
    let listener = TcpListener::bind(config.addr).await?;
    info!("waflow-gateway listening on {}", config.addr);

    serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
