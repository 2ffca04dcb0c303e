/// Configuration loading from a TOML file layered with environment overrides
use std::path::Path;

use config::{Environment, File, FileFormat};
use reqwest::Url;
use tracing::debug;

use crate::error::{FxError, Result};
use crate::rates::TrackedCurrencies;
use crate::types::{Config, StoreBackend};

/// Env prefix for overrides, e.g. `FXREF__STORE__BACKEND=memory`
pub const ENV_PREFIX: &str = "FXREF";

/// Fills `store.project_id` when set
pub const PROJECT_ID_VAR: &str = "GCP_PROJECT_ID";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
    }

    let settings = config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("pipeline.currencies")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;

    if let Ok(project_id) = std::env::var(PROJECT_ID_VAR) {
        if !project_id.trim().is_empty() {
            config.store.project_id = Some(project_id);
        }
    }

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    // Whitelist
    TrackedCurrencies::new(&config.pipeline.currencies)
        .map_err(|e| FxError::ConfigError(format!("pipeline.currencies: {}", e)))?;

    // Source
    Url::parse(&config.source.base_url).map_err(|e| {
        FxError::ConfigError(format!("Invalid source.base_url '{}': {}", config.source.base_url, e))
    })?;
    if config.source.feed_path_fragment.trim().is_empty() {
        return Err(FxError::ConfigError("source.feed_path_fragment is empty".to_string()));
    }
    if config.source.request_timeout_sec == 0 {
        return Err(FxError::ConfigError("source.request_timeout_sec must be > 0".to_string()));
    }

    // Store identifier for the chosen backend
    match config.store.backend {
        StoreBackend::File => {
            if config.store.file_path.as_deref().map_or(true, |p| p.trim().is_empty()) {
                return Err(FxError::MissingSetting("store.file_path".to_string()));
            }
        }
        StoreBackend::Document => {
            if config.store.project_id.as_deref().map_or(true, |p| p.trim().is_empty()) {
                return Err(FxError::MissingSetting(format!(
                    "store.project_id (or {})",
                    PROJECT_ID_VAR
                )));
            }
        }
        StoreBackend::Memory => {}
    }

    // Retention keeps only the newest day
    if config.pipeline.prune_stale {
        if !config.pipeline.latest_only {
            return Err(FxError::ConfigError(
                "pipeline.prune_stale requires pipeline.latest_only".to_string(),
            ));
        }
        if config.pipeline.max_removals == 0 {
            return Err(FxError::ConfigError(
                "pipeline.max_removals must be > 0 when prune_stale is on".to_string(),
            ));
        }
    }

    Ok(())
}
