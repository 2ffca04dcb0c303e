/// List the rate feeds linked from the index page
use tracing_subscriber::EnvFilter;

use fxref::config::load_config;
use fxref::feed::{discover_feed_urls, source_from_config, FeedFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config.toml".to_string());
    let config = load_config(&config_path)?;

    let source = source_from_config(&config.source)?;
    let filter = FeedFilter::new(
        config.source.feed_path_fragment.clone(),
        config.source.excluded_marker.clone(),
    );

    let html = source.index_page().await?;
    let urls = discover_feed_urls(&html, source.base_url(), &filter)?;

    if urls.is_empty() {
        println!("⚠️  No feeds matched '{}'", filter.path_fragment);
        return Ok(());
    }

    println!("📡 {} rate feeds:", urls.len());
    for url in &urls {
        println!("   {}", url);
    }

    Ok(())
}
