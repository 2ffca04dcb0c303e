/// Cross-rate triangulation through the pivot currency
use std::sync::Arc;

use tracing::{debug, warn};

use crate::rates::TrackedCurrencies;
use crate::types::ExchangeRateRecord;

pub struct CrossRateCalculator {
    tracked: Arc<TrackedCurrencies>,
}

impl CrossRateCalculator {
    pub fn new(tracked: Arc<TrackedCurrencies>) -> Self {
        CrossRateCalculator { tracked }
    }

    /// Derive one record per tracked currency present in `pivot_record`,
    /// rebased onto that currency.
    ///
    /// For a new base `x` with pivot rate `rx`, the pivot is quoted at `1 / rx`
    /// and every other present currency `y` at `ry / rx`. Bases with a zero or
    /// non-finite `rx` are skipped. Output follows whitelist order.
    pub fn derive(&self, pivot_record: &ExchangeRateRecord) -> Vec<ExchangeRateRecord> {
        let pivot = pivot_record.base.as_str();
        let mut derived = Vec::new();

        for new_base in self.tracked.iter() {
            if new_base == pivot {
                continue;
            }
            let Some(base_rate) = pivot_record.rate(new_base) else {
                continue;
            };
            if base_rate == 0.0 || !base_rate.is_finite() {
                warn!(
                    "Skipping {} cross rates on {}: pivot rate is {}",
                    new_base, pivot_record.date, base_rate
                );
                continue;
            }

            let mut record = ExchangeRateRecord::new(pivot_record.date, new_base);
            record.rates.insert(pivot.to_string(), 1.0 / base_rate);

            for other in self.tracked.iter() {
                if other == new_base || other == pivot {
                    continue;
                }
                if let Some(other_rate) = pivot_record.rate(other) {
                    record.rates.insert(other.to_string(), other_rate / base_rate);
                }
            }

            if record.is_empty() {
                continue;
            }
            derived.push(record);
        }

        debug!(
            "Derived {} cross-rate records from {} on {}",
            derived.len(),
            pivot,
            pivot_record.date
        );
        derived
    }

    /// The pivot record followed by everything derived from it.
    /// Empty records are left out.
    pub fn expand(&self, pivot_record: ExchangeRateRecord) -> Vec<ExchangeRateRecord> {
        if pivot_record.is_empty() {
            return Vec::new();
        }
        let derived = self.derive(&pivot_record);
        let mut out = Vec::with_capacity(derived.len() + 1);
        out.push(pivot_record);
        out.extend(derived);
        out
    }
}
