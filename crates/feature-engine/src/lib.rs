//! Feature Engineering Engine
//!
//! Turns ascending per-sensor reading series into fixed-schema feature
//! vectors: multi-window aggregates, CO2 rate-of-change, light and calendar
//! encodings, and cross-sensor interaction terms.

mod calendar;
mod extractor;
mod features;
mod statistics;

pub use calendar::{CalendarFeatures, Season};
pub use extractor::{
    daylight_factor, group_by_sensor, latest_readings, light_level, ExtractorConfig,
    FeatureExtractor,
};
pub use features::{FeatureVector, FEATURE_NAMES, SCHEMA_VERSION};
pub use statistics::{count_motion, Measurement, WindowStats};

use thiserror::Error;

/// Structurally invalid input reaching the engine
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Timestamp {0} cannot be represented as a calendar date")]
    InvalidTimestamp(i64),
}
