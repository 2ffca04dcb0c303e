use std::sync::Arc;

use chrono::NaiveDate;

use fxref::feed::{FeedSource, FixtureFeedSource};
use fxref::pipeline::IngestPipeline;
use fxref::store::{JsonFileStore, MemoryRateStore, RateStore};
use fxref::types::{Config, StoreBackend};

const BASE_URL: &str = "https://www.ecb.europa.eu";

fn fixtures() -> Arc<dyn FeedSource> {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");
    Arc::new(FixtureFeedSource::new(dir, BASE_URL))
}

fn config() -> Config {
    let mut config = Config::default();
    config.store.backend = StoreBackend::Memory;
    config
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

#[tokio::test]
async fn test_fixture_run_is_idempotent() {
    let store = Arc::new(MemoryRateStore::new());
    let pipeline = IngestPipeline::from_config(&config(), fixtures(), store.clone()).unwrap();

    let first = pipeline.run().await.unwrap();
    // usd, jpy, gbp, chf, rub; eek is excluded and usd is linked twice
    assert_eq!(first.feeds_fetched, 5);
    // 2025-11-21: EUR + 4 derived. 2025-11-20: EUR + 3 derived (CHF entry is malformed)
    assert_eq!(first.stored, 9);
    assert_eq!(first.to_string(), "2025-11-21 9-0");

    let second = pipeline.run().await.unwrap();
    assert_eq!(second.candidates, 9);
    assert_eq!(second.stored, 0);
    assert_eq!(store.len().await, 9);
}

#[tokio::test]
async fn test_fixture_cross_rates() {
    let store = Arc::new(MemoryRateStore::new());
    IngestPipeline::from_config(&config(), fixtures(), store.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let eur = store.get("EUR", day(21)).await.unwrap();
    assert_eq!(eur.rate("USD"), Some(1.152));
    assert!(eur.rate("EUR").is_none());

    let usd = store.get("USD", day(21)).await.unwrap();
    assert!((usd.rate("EUR").unwrap() - 1.0 / 1.152).abs() < 1e-9);
    assert!((usd.rate("JPY").unwrap() - 181.24 / 1.152).abs() < 1e-9);
    assert!(usd.rate("USD").is_none());

    // No CHF observation survived for the 20th
    assert!(store.get("CHF", day(20)).await.is_none());
    assert!(store.get("USD", day(20)).await.unwrap().rate("CHF").is_none());

    // Untracked currencies never appear
    for record in store.records().await {
        assert_ne!(record.base, "RUB");
        assert!(!record.rates.contains_key("RUB"));
    }
}

#[tokio::test]
async fn test_latest_only_with_pruning() {
    let store = Arc::new(MemoryRateStore::new());
    IngestPipeline::from_config(&config(), fixtures(), store.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let mut pruning = config();
    pruning.pipeline.latest_only = true;
    pruning.pipeline.prune_stale = true;
    pruning.pipeline.max_removals = 3;

    let pipeline = IngestPipeline::from_config(&pruning, fixtures(), store.clone()).unwrap();
    let report = pipeline.run().await.unwrap();
    assert_eq!(report.candidates, 5);
    assert_eq!(report.stored, 0);
    assert_eq!(report.removed, 3);
    assert_eq!(report.to_string(), " 0-3");

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(store.len().await, 5);
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exchange_rates.json");

    let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
    let report = IngestPipeline::from_config(&config(), fixtures(), store)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.stored, 9);

    let reopened = Arc::new(JsonFileStore::open(&path).await.unwrap());
    let records = reopened.records().await;
    assert_eq!(records.len(), 9);
    assert_eq!(records[0].date.date(), day(21));
    assert!(reopened.exists(&records[8].key()).await.unwrap());

    let again = IngestPipeline::from_config(&config(), fixtures(), reopened)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(again.stored, 0);
}
