/// Document-store backend over the Firestore REST API.
///
/// Talks to an unauthenticated endpoint (the emulator, or a proxy that adds
/// credentials). Documents are `{date: "YYYY-MM-DD", base, rates}` under
/// id `"{base}-{date}"`.
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{FxError, Result};
use crate::store::{document_id, RateStore};
use crate::types::{ExchangeRateRecord, RecordKey};
use crate::utils::format_day;

/// Firestore rejects commits with more writes than this
const MAX_WRITES_PER_COMMIT: usize = 500;

pub struct DocumentStore {
    client: Client,
    timeout: Duration,
    endpoint: String,
    database: String,
    collection: String,
}

impl DocumentStore {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if project_id.trim().is_empty() {
            return Err(FxError::MissingSetting("store.project_id".to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("fxref/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(DocumentStore {
            client,
            timeout,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            database: format!("projects/{}/databases/(default)", project_id),
            collection: collection.to_string(),
        })
    }

    fn documents_url(&self) -> String {
        format!("{}/v1/{}/documents", self.endpoint, self.database)
    }

    fn document_name(&self, id: &str) -> String {
        format!("{}/documents/{}/{}", self.database, self.collection, id)
    }

    async fn commit(&self, writes: Vec<Value>) -> Result<()> {
        let url = format!("{}:commit", self.documents_url());
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&json!({ "writes": writes }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FxError::StoreWrite(format!("commit returned {}: {}", status, body)));
        }
        Ok(())
    }
}

/// Firestore typed-value encoding of one record
pub fn encode_document(record: &ExchangeRateRecord) -> Value {
    let rates: Map<String, Value> = record
        .rates
        .iter()
        .map(|(code, rate)| (code.clone(), json!({ "doubleValue": rate })))
        .collect();

    json!({
        "date": { "stringValue": format_day(record.date.date()) },
        "base": { "stringValue": record.base },
        "rates": { "mapValue": { "fields": rates } },
    })
}

/// Document names out of a `:runQuery` response stream
pub fn document_names(response: &Value) -> Vec<String> {
    response
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.pointer("/document/name"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn stale_query(collection: &str, keep: NaiveDate, limit: usize) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "date" },
                    "op": "NOT_EQUAL",
                    "value": { "stringValue": format_day(keep) },
                }
            },
            "limit": limit,
        }
    })
}

#[async_trait]
impl RateStore for DocumentStore {
    async fn exists(&self, key: &RecordKey) -> Result<bool> {
        let url = format!(
            "{}/{}/{}",
            self.documents_url(),
            self.collection,
            document_id(key)
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FxError::StoreLookup(format!("{}: {}", key, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(FxError::StoreLookup(format!(
                "lookup of {} returned {}",
                key, status
            ))),
        }
    }

    async fn write_batch(&self, records: &[ExchangeRateRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if records.len() > MAX_WRITES_PER_COMMIT {
            warn!(
                "Batch of {} records spans several commits; atomicity holds per {} records",
                records.len(),
                MAX_WRITES_PER_COMMIT
            );
        }

        for chunk in records.chunks(MAX_WRITES_PER_COMMIT) {
            let writes = chunk
                .iter()
                .map(|record| {
                    json!({
                        "update": {
                            "name": self.document_name(&document_id(&record.key())),
                            "fields": encode_document(record),
                        }
                    })
                })
                .collect();
            self.commit(writes).await?;
            debug!("Committed {} documents to {}", chunk.len(), self.collection);
        }
        Ok(())
    }

    async fn remove_stale(&self, keep: NaiveDate, limit: usize) -> Result<usize> {
        if limit == 0 {
            return Ok(0);
        }

        let url = format!("{}:runQuery", self.documents_url());
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&stale_query(&self.collection, keep, limit))
            .send()
            .await
            .map_err(|e| FxError::StoreLookup(format!("stale query: {}", e)))?;
        if !response.status().is_success() {
            return Err(FxError::StoreLookup(format!(
                "stale query returned {}",
                response.status()
            )));
        }

        let rows: Value = response.json().await?;
        let names = document_names(&rows);
        if names.is_empty() {
            return Ok(0);
        }

        let removed = names.len().min(limit);
        let writes = names
            .into_iter()
            .take(limit)
            .map(|name| json!({ "delete": name }))
            .collect();
        self.commit(writes).await?;
        Ok(removed)
    }
}
