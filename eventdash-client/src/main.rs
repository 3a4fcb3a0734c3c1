use std::time::Duration;

use anyhow::Result;

use eventdash_client::config::{self, DEFAULT_CONFIG_PATH};
use eventdash_client::health::{HealthAggregator, HttpProbe};
use eventdash_client::logging;
use eventdash_client::DashboardClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::read_config(&config_path)?;
    let _logging_guard = logging::init_logging(&config.log_dir, "eventdash-monitor", &config.log_level)?;

    tracing::info!("Eventdash monitor starting against {}", config.base_url);

    let client = DashboardClient::from_config(config)?;
    let aggregator = HealthAggregator::new();
    for probe in &config.health.probes {
        let http_probe = HttpProbe::from_config(client.http().clone(), config, probe);
        tracing::info!("Watching {} at {}", probe.id, http_probe.url());
        aggregator.register_probe(probe.id.clone(), http_probe);
    }

    match client.handler_status().await {
        Ok(status) => tracing::info!("Event handler: {}", status.status),
        Err(e) => tracing::warn!("Could not read event handler status: {}", e),
    }

    aggregator.start_polling(Duration::from_secs(config.health.poll_interval_secs.max(1)));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    aggregator.stop_polling();

    Ok(())
}
