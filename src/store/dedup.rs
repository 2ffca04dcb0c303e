/// Admit only records whose (date, base) is not already persisted
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::store::RateStore;
use crate::types::ExchangeRateRecord;

/// Result of filtering one candidate batch
#[derive(Debug, Default)]
pub struct Admission {
    pub admitted: Vec<ExchangeRateRecord>,
    pub already_stored: usize,
    pub discarded_empty: usize,
    pub repeated: usize,
}

impl Admission {
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }
}

/// Check-then-write deduplication.
///
/// There is no lock between the existence check and the later write, so two
/// concurrent runs may both admit the same key. Delivery is at-least-once.
pub struct DeduplicationFilter {
    store: Arc<dyn RateStore>,
}

impl DeduplicationFilter {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        DeduplicationFilter { store }
    }

    /// Each candidate is looked up on its own, so a batch may be partly admitted.
    /// A failed lookup fails the whole batch.
    pub async fn admit(&self, candidates: Vec<ExchangeRateRecord>) -> Result<Admission> {
        let mut admission = Admission::default();
        let mut seen = HashSet::new();

        for candidate in candidates {
            if candidate.is_empty() {
                admission.discarded_empty += 1;
                continue;
            }

            let key = candidate.key();
            if !seen.insert(key.clone()) {
                admission.repeated += 1;
                continue;
            }

            if self.store.exists(&key).await? {
                debug!("Already stored: {}", key);
                admission.already_stored += 1;
                continue;
            }

            admission.admitted.push(candidate);
        }

        debug!(
            "Admitted {} records ({} already stored, {} empty, {} repeated)",
            admission.admitted.len(),
            admission.already_stored,
            admission.discarded_empty,
            admission.repeated
        );
        Ok(admission)
    }
}
