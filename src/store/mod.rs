/// Persistence boundary for finalized exchange-rate records
pub mod dedup;
pub mod memory;
pub mod file_store;
pub mod document_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::error::{FxError, Result};
use crate::types::{ExchangeRateRecord, RecordKey, StoreBackend, StoreConfig};
use crate::utils::format_day;

pub use dedup::{Admission, DeduplicationFilter};
pub use document_store::DocumentStore;
pub use file_store::JsonFileStore;
pub use memory::MemoryRateStore;

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Whether a record for this (date, base) is already persisted
    async fn exists(&self, key: &RecordKey) -> Result<bool>;

    /// Persist every record or none of them
    async fn write_batch(&self, records: &[ExchangeRateRecord]) -> Result<()>;

    /// Delete up to `limit` records dated on any day other than `keep`.
    /// Returns how many were removed.
    async fn remove_stale(&self, keep: NaiveDate, limit: usize) -> Result<usize>;
}

/// Document-store id, `"{base}-{YYYY-MM-DD}"`
pub fn document_id(key: &RecordKey) -> String {
    format!("{}-{}", key.base, format_day(key.date))
}

/// Open the configured backend. `timeout` bounds each remote request.
pub async fn store_from_config(
    config: &StoreConfig,
    timeout: Duration,
) -> Result<Arc<dyn RateStore>> {
    info!("Using {} store", config.backend.as_str());

    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryRateStore::new())),
        StoreBackend::File => {
            let path = config
                .file_path
                .as_deref()
                .ok_or_else(|| FxError::MissingSetting("store.file_path".to_string()))?;
            Ok(Arc::new(JsonFileStore::open(path).await?))
        }
        StoreBackend::Document => {
            let project_id = config
                .project_id
                .as_deref()
                .ok_or_else(|| FxError::MissingSetting("store.project_id".to_string()))?;
            Ok(Arc::new(DocumentStore::new(
                &config.endpoint,
                project_id,
                &config.collection,
                timeout,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_document_id_uses_day_only() {
        let date = NaiveDateTime::parse_from_str("2023-12-25T14:15:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        assert_eq!(document_id(&RecordKey::new(date.date(), "USD")), "USD-2023-12-25");
    }

    #[tokio::test]
    async fn test_document_backend_requires_project() {
        let config = StoreConfig {
            backend: StoreBackend::Document,
            project_id: None,
            ..StoreConfig::default()
        };
        assert!(matches!(
            store_from_config(&config, Duration::from_secs(30)).await,
            Err(FxError::MissingSetting(_))
        ));
    }
}
