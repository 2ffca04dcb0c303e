/// Flat-file store: one JSON array, newest first, full timestamps
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::store::RateStore;
use crate::types::{ExchangeRateRecord, RecordKey};

struct FileState {
    records: Vec<ExchangeRateRecord>,
    keys: HashSet<RecordKey>,
}

impl FileState {
    fn new(records: Vec<ExchangeRateRecord>) -> Self {
        let keys = records.iter().map(ExchangeRateRecord::key).collect();
        FileState { records, keys }
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl JsonFileStore {
    /// Load `path` if it exists, start empty otherwise
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<ExchangeRateRecord>>(&content)?
            }
        } else {
            debug!("No existing rate file at {}", path.display());
            Vec::new()
        };

        info!("Loaded {} records from {}", records.len(), path.display());
        Ok(JsonFileStore {
            path,
            state: RwLock::new(FileState::new(records)),
        })
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }

    pub async fn records(&self) -> Vec<ExchangeRateRecord> {
        self.state.read().await.records.clone()
    }

    /// Replace the file contents via a temp file so readers never see half a write
    async fn persist(&self, records: &[ExchangeRateRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn newest_first(records: &mut [ExchangeRateRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.base.cmp(&b.base)));
}

#[async_trait]
impl RateStore for JsonFileStore {
    async fn exists(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.state.read().await.keys.contains(key))
    }

    async fn write_batch(&self, records: &[ExchangeRateRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let mut next: Vec<ExchangeRateRecord> = state
            .records
            .iter()
            .filter(|r| !records.iter().any(|n| n.key() == r.key()))
            .cloned()
            .collect();
        next.extend(records.iter().cloned());
        newest_first(&mut next);

        // Memory only changes once the file is in place
        self.persist(&next).await?;
        *state = FileState::new(next);

        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    async fn remove_stale(&self, keep: NaiveDate, limit: usize) -> Result<usize> {
        let mut state = self.state.write().await;

        let mut removed = 0;
        let next: Vec<ExchangeRateRecord> = state
            .records
            .iter()
            .filter(|r| {
                if r.date.date() != keep && removed < limit {
                    removed += 1;
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();

        if removed > 0 {
            self.persist(&next).await?;
            *state = FileState::new(next);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(date: &str, base: &str, rate: f64) -> ExchangeRateRecord {
        let date = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S").unwrap();
        ExchangeRateRecord::with_rates(date, base, [("JPY".to_string(), rate)])
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("rates.json")).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_writes_newest_first_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rates.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .write_batch(&[
                record("2025-11-20T14:15:00", "USD", 155.1),
                record("2025-11-21T14:15:00", "USD", 157.2),
            ])
            .await
            .unwrap();
        store
            .write_batch(&[record("2025-11-21T14:15:00", "EUR", 181.1)])
            .await
            .unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let records = reopened.records().await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].base, "EUR");
        assert_eq!(records[1].base, "USD");
        assert_eq!(records[2].date.date(), NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
        assert!(reopened.exists(&records[2].key()).await.unwrap());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["date"], "2025-11-21T14:15:00");
    }

    #[tokio::test]
    async fn test_same_day_write_replaces_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("rates.json")).await.unwrap();

        store.write_batch(&[record("2025-11-21T14:15:00", "USD", 157.2)]).await.unwrap();
        let evening = record("2025-11-21T15:00:00", "USD", 157.9);
        assert!(store.exists(&evening.key()).await.unwrap());

        store.write_batch(&[evening]).await.unwrap();
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rate("JPY"), Some(157.9));
    }

    #[tokio::test]
    async fn test_remove_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .write_batch(&[
                record("2025-11-19T14:15:00", "USD", 1.0),
                record("2025-11-20T14:15:00", "USD", 1.0),
                record("2025-11-21T14:15:00", "USD", 1.0),
            ])
            .await
            .unwrap();

        let keep = NaiveDate::from_ymd_opt(2025, 11, 21).unwrap();
        assert_eq!(store.remove_stale(keep, 1).await.unwrap(), 1);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.remove_stale(keep, 10).await.unwrap(), 1);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 1);
    }
}
