use anyhow::{Context, Result};
use tracing::info;

use geodata_gateway::{GatewayConfig, VERSION, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::load().with_context(|| "Failed to load configuration")?;
    let _telemetry = telemetry::init(&config.logging)?;

    info!(
        "Starting geodata gateway v{} (timezone {}, geocoding flag '{}')",
        VERSION, config.defaults.timezone, config.flags.geocoding_flag
    );

    web::run(&config).await
}
