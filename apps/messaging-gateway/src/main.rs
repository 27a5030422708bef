use anyhow::Result;
use waflow_gateway::{GatewayConfig, run};
use waflow_telemetry::install as init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry("waflow-gateway")?;

    let config = GatewayConfig::from_env()?;
    run(config).await
}
