/// End-to-end ingestion run
pub mod ingest;

pub use ingest::{IngestPipeline, PipelineSettings, RunReport};
