/// Core type definitions for the rate pipeline
use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::format_day;

/// One base→target rate read from a single feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRateObservation {
    pub date: NaiveDateTime,
    pub pivot_currency: String,
    pub target_currency: String,
    pub rate: f64,
}

/// Identity of a stored record: calendar day and base.
/// The time of day is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub date: NaiveDate,
    pub base: String,
}

impl RecordKey {
    pub fn new(date: NaiveDate, base: impl Into<String>) -> Self {
        RecordKey { date, base: base.into() }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.base, format_day(self.date))
    }
}

/// Rates of every tracked currency against `base` on `date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRecord {
    pub date: NaiveDateTime,
    pub base: String,
    pub rates: BTreeMap<String, f64>,
}

impl ExchangeRateRecord {
    pub fn new(date: NaiveDateTime, base: impl Into<String>) -> Self {
        ExchangeRateRecord {
            date,
            base: base.into(),
            rates: BTreeMap::new(),
        }
    }

    pub fn with_rates(
        date: NaiveDateTime,
        base: impl Into<String>,
        rates: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        ExchangeRateRecord {
            date,
            base: base.into(),
            rates: rates.into_iter().collect(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.date.date(), self.base.clone())
    }

    /// Null records are never persisted
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }
}

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Document,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &str {
        match self {
            StoreBackend::File => "file",
            StoreBackend::Document => "document",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Configuration for the ingestion run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: SourceConfig::default(),
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_index_path")]
    pub index_path: String,
    #[serde(default = "default_feed_path_fragment")]
    pub feed_path_fragment: String,
    #[serde(default = "default_excluded_marker")]
    pub excluded_marker: String,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Read index page and feeds from disk instead of the network
    #[serde(default)]
    pub fixtures_dir: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: default_base_url(),
            index_path: default_index_path(),
            feed_path_fragment: default_feed_path_fragment(),
            excluded_marker: default_excluded_marker(),
            request_timeout_sec: default_request_timeout_sec(),
            requests_per_second: default_requests_per_second(),
            fixtures_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_file_path")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: default_backend(),
            file_path: default_file_path(),
            project_id: None,
            endpoint: default_endpoint(),
            collection: default_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    /// Only the newest date of the fetched feeds is expanded and stored
    #[serde(default)]
    pub latest_only: bool,
    #[serde(default)]
    pub prune_stale: bool,
    #[serde(default = "default_max_removals")]
    pub max_removals: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            currencies: default_currencies(),
            latest_only: false,
            prune_stale: false,
            max_removals: default_max_removals(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://www.ecb.europa.eu".to_string()
}

fn default_index_path() -> String {
    "/home/html/rss.en.html".to_string()
}

fn default_feed_path_fragment() -> String {
    "/rss/fxref".to_string()
}

fn default_excluded_marker() -> String {
    "eek".to_string()
}

fn default_request_timeout_sec() -> u64 {
    30
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_file_path() -> Option<String> {
    Some("data/exchange_rates.json".to_string())
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_collection() -> String {
    "exchange_rates".to_string()
}

fn default_max_removals() -> usize {
    100
}

/// Currencies tracked by the reference feed over its lifetime
pub const DEFAULT_CURRENCIES: &[&str] = &[
    "USD", "JPY", "BGN", "CYP", "CZK", "DKK", "EEK", "GBP", "HUF", "LTL", "LVL", "MTL", "PLN",
    "ROL", "RON", "SEK", "SIT", "SKK", "CHF", "ISK", "NOK", "HRK", "TRL", "TRY", "AUD", "BRL",
    "CAD", "CNY", "HKD", "IDR", "ILS", "INR", "KRW", "MXN", "MYR", "NZD", "PHP", "SGD", "THB",
    "ZAR",
];

fn default_currencies() -> Vec<String> {
    DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect()
}
