//! aqsense - Air-quality sensor time-series pipeline
//!
//! Retrieves raw sensor readings from a partition-key-indexed table
//! store, normalizes them into aligned time series, and reconciles them
//! into fleet-wide tables:
//!
//! - Sortable partition-key codec for time-range filters
//! - Query construction with identity, range, projection, and row cap
//! - Result normalization into timestamp-indexed tables
//! - Fixed-grid resampling with hourly/daily rollups
//! - Sensor-replacement reconciliation and manual corrections
//! - Secondary CSV deployment and weather payload decoding

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod codec;
pub mod config;
pub mod csvsource;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod reconcile;
pub mod resample;
pub mod series;
pub mod store;
pub mod types;
pub mod weather;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{CombinedSeries, Pipeline};
pub use query::QuerySpec;
pub use series::{SensorTable, WideTable};
pub use types::{PartitionKey, Resolution, SensorReading, TimeWindow};
