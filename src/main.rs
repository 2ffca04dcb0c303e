/// Main entry point for one ingestion run
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fxref::{
    config::load_config,
    feed::source_from_config,
    pipeline::IngestPipeline,
    store::store_from_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config.toml".to_string());

    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("🚀 Starting reference rate ingestion");
    info!("   Tracking {} currencies", config.pipeline.currencies.len());

    let source = source_from_config(&config.source)?;
    let timeout = Duration::from_secs(config.source.request_timeout_sec);
    let store = store_from_config(&config.store, timeout).await?;
    let pipeline = IngestPipeline::from_config(&config, source, store)?;

    match pipeline.run().await {
        Ok(report) => {
            info!("SUCCESS {}", report);
            Ok(())
        }
        Err(e) => {
            error!("❌ Ingestion failed [{}]: {}", e.error_code(), e);
            if e.is_recoverable() {
                info!("   The next scheduled run may succeed");
            }
            Err(e.into())
        }
    }
}
