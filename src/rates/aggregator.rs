/// Merge raw observations into one pivot-based record per date
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::rates::TrackedCurrencies;
use crate::types::{ExchangeRateRecord, RawRateObservation};

pub struct RateAggregator {
    tracked: Arc<TrackedCurrencies>,
    records: BTreeMap<NaiveDate, ExchangeRateRecord>,
    accepted: usize,
    dropped: usize,
}

impl RateAggregator {
    pub fn new(tracked: Arc<TrackedCurrencies>) -> Self {
        RateAggregator {
            tracked,
            records: BTreeMap::new(),
            accepted: 0,
            dropped: 0,
        }
    }

    /// Fold one observation into the record for its calendar day.
    ///
    /// The record is created on first sight of a day even if the observation
    /// itself is then dropped. Observations published at different times of
    /// the same day merge into one record stamped with the latest time. A
    /// later observation for the same (day, target) overwrites the earlier one.
    pub fn ingest(&mut self, observation: RawRateObservation) {
        let record = self
            .records
            .entry(observation.date.date())
            .or_insert_with(|| {
                ExchangeRateRecord::new(observation.date, observation.pivot_currency.clone())
            });
        if observation.date > record.date {
            record.date = observation.date;
        }

        if !self.tracked.contains(&observation.target_currency)
            || observation.target_currency == record.base
        {
            self.dropped += 1;
            return;
        }

        if let Some(previous) = record
            .rates
            .insert(observation.target_currency.clone(), observation.rate)
        {
            debug!(
                "Overwrote {} on {}: {} -> {}",
                observation.target_currency, observation.date, previous, observation.rate
            );
        }
        self.accepted += 1;
    }

    pub fn ingest_all<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = RawRateObservation>,
    {
        for observation in observations {
            self.ingest(observation);
        }
    }

    /// Timestamp of the newest record
    pub fn latest_date(&self) -> Option<NaiveDateTime> {
        self.records.values().next_back().map(|r| r.date)
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered oldest first
    pub fn finish(self) -> Vec<ExchangeRateRecord> {
        self.records.into_values().collect()
    }
}
