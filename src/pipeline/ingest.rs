/// One sequential ingestion pass:
/// discover -> fetch -> parse -> aggregate -> triangulate -> dedup -> write
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::feed::{discover_feed_urls, FeedFilter, FeedParser, FeedSource};
use crate::rates::{CrossRateCalculator, RateAggregator, TrackedCurrencies};
use crate::store::{DeduplicationFilter, RateStore};
use crate::types::{Config, ExchangeRateRecord};
use crate::utils::format_day;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub filter: FeedFilter,
    pub latest_only: bool,
    pub prune_stale: bool,
    pub max_removals: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        PipelineSettings {
            filter: FeedFilter::new(
                config.source.feed_path_fragment.clone(),
                config.source.excluded_marker.clone(),
            ),
            latest_only: config.pipeline.latest_only,
            prune_stale: config.pipeline.prune_stale,
            max_removals: config.pipeline.max_removals,
        }
    }
}

/// Outcome of a run. Displays as `"{date} {stored}-{removed}"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Newest date among the stored records
    pub latest_date: Option<NaiveDate>,
    pub feeds_fetched: usize,
    pub candidates: usize,
    pub stored: usize,
    pub removed: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.latest_date.map(format_day).unwrap_or_default();
        write!(f, "{} {}-{}", date, self.stored, self.removed)
    }
}

pub struct IngestPipeline {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn RateStore>,
    tracked: Arc<TrackedCurrencies>,
    settings: PipelineSettings,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn RateStore>,
        tracked: Arc<TrackedCurrencies>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            store,
            tracked,
            settings,
        }
    }

    pub fn from_config(
        config: &Config,
        source: Arc<dyn FeedSource>,
        store: Arc<dyn RateStore>,
    ) -> Result<Self> {
        let tracked = Arc::new(TrackedCurrencies::new(&config.pipeline.currencies)?);
        Ok(Self::new(
            source,
            store,
            tracked,
            PipelineSettings::from_config(config),
        ))
    }

    /// Feed URLs linked from the index page
    pub async fn discover(&self) -> Result<Vec<String>> {
        let html = self.source.index_page().await?;
        let urls = discover_feed_urls(&html, self.source.base_url(), &self.settings.filter)?;
        info!("🔍 Discovered {} rate feeds", urls.len());
        Ok(urls)
    }

    /// Fetch and parse every feed in order, folding observations into one
    /// aggregator. Later feeds win on (date, target) collisions.
    pub async fn collect(&self, urls: &[String]) -> Result<RateAggregator> {
        let mut aggregator = RateAggregator::new(Arc::clone(&self.tracked));

        for (i, url) in urls.iter().enumerate() {
            debug!("[{}/{}] Fetching {}", i + 1, urls.len(), url);
            let document = self.source.fetch(url).await?;

            let mut parser = FeedParser::new(&document);
            for observation in parser.by_ref() {
                aggregator.ingest(observation?);
            }
            debug!(
                "   {} entries parsed, {} skipped",
                parser.parsed(),
                parser.skipped()
            );
        }

        info!(
            "📥 Aggregated {} dates ({} rates kept, {} dropped)",
            aggregator.len(),
            aggregator.accepted(),
            aggregator.dropped()
        );
        Ok(aggregator)
    }

    /// Pivot records plus every derived cross-rate record
    pub fn expand(&self, pivot_records: Vec<ExchangeRateRecord>) -> Vec<ExchangeRateRecord> {
        let calculator = CrossRateCalculator::new(Arc::clone(&self.tracked));
        pivot_records
            .into_iter()
            .flat_map(|record| calculator.expand(record))
            .collect()
    }

    pub async fn run(&self) -> Result<RunReport> {
        let urls = self.discover().await?;
        let aggregator = self.collect(&urls).await?;
        let latest = aggregator.latest_date().map(|d| d.date());

        let mut pivot_records = aggregator.finish();
        if self.settings.latest_only {
            pivot_records.retain(|r| Some(r.date.date()) == latest);
        }

        let candidates = self.expand(pivot_records);
        info!("🧮 {} candidate records after triangulation", candidates.len());

        let mut report = RunReport {
            feeds_fetched: urls.len(),
            candidates: candidates.len(),
            ..RunReport::default()
        };

        let admission = DeduplicationFilter::new(Arc::clone(&self.store))
            .admit(candidates)
            .await?;

        if admission.is_empty() {
            info!("No new data found to save");
        } else {
            self.store.write_batch(&admission.admitted).await?;
            report.stored = admission.admitted.len();
            report.latest_date = admission.admitted.iter().map(|r| r.date.date()).max();
            info!(
                "💾 Stored {} records ({} already present)",
                report.stored, admission.already_stored
            );
        }

        if self.settings.prune_stale && !self.settings.latest_only {
            warn!("Skipping retention: it would delete the older days just written");
        } else if self.settings.prune_stale {
            if let Some(keep) = latest {
                report.removed = self
                    .store
                    .remove_stale(keep, self.settings.max_removals)
                    .await?;
                if report.removed > 0 {
                    info!("🧹 Removed {} records not dated {}", report.removed, keep);
                }
            }
        }

        info!("✅ Run complete: {}", report);
        Ok(report)
    }
}
