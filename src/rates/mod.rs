pub mod whitelist;
pub mod aggregator;
pub mod cross_rates;

pub use whitelist::TrackedCurrencies;
pub use aggregator::RateAggregator;
pub use cross_rates::CrossRateCalculator;
