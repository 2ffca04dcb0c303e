/// In-process document map, keyed the same way as the document store
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::{document_id, RateStore};
use crate::types::{ExchangeRateRecord, RecordKey};

#[derive(Default)]
pub struct MemoryRateStore {
    documents: RwLock<BTreeMap<String, ExchangeRateRecord>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        MemoryRateStore::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ExchangeRateRecord>) -> Self {
        let documents = records
            .into_iter()
            .map(|r| (document_id(&r.key()), r))
            .collect();
        MemoryRateStore {
            documents: RwLock::new(documents),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn get(&self, base: &str, day: NaiveDate) -> Option<ExchangeRateRecord> {
        let documents = self.documents.read().await;
        documents
            .values()
            .find(|r| r.base == base && r.date.date() == day)
            .cloned()
    }

    pub async fn records(&self) -> Vec<ExchangeRateRecord> {
        self.documents.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn exists(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.documents.read().await.contains_key(&document_id(key)))
    }

    async fn write_batch(&self, records: &[ExchangeRateRecord]) -> Result<()> {
        let mut documents = self.documents.write().await;
        for record in records {
            documents.insert(document_id(&record.key()), record.clone());
        }
        Ok(())
    }

    async fn remove_stale(&self, keep: NaiveDate, limit: usize) -> Result<usize> {
        let mut documents = self.documents.write().await;
        let stale: Vec<String> = documents
            .iter()
            .filter(|(_, r)| r.date.date() != keep)
            .map(|(id, _)| id.clone())
            .take(limit)
            .collect();

        for id in &stale {
            documents.remove(id);
        }
        Ok(stale.len())
    }
}
