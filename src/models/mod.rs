//! Data models shared across the API, the store, and the ingestion pipeline.

pub mod patient;
pub mod reading;
pub mod vital;

pub use patient::{Patient, ThresholdRange, VitalThresholds};
pub use reading::Reading;
pub use vital::Vital;
