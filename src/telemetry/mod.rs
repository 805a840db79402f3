//! Telemetry ingestion: broker transport plus the ingestion-and-broadcast
//! pipeline.

pub mod broker;
pub mod ingest;

pub use ingest::{Ingestor, TelemetryMessage, MERGE_WINDOW_SECS};
