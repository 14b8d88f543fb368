//! Sensor History
//!
//! Room-climate sensor readings, trailing-window selection over ascending
//! series, and a bounded per-sensor history store.

mod codec;
mod history;
mod store;
mod window;

pub use codec::{ReadingCodec, WireFormat};
pub use history::{HistoryConfig, SensorHistory, DEFAULT_CAPACITY, DEFAULT_RETENTION_SECS};
pub use store::HistoryStore;
pub use window::{select_window, WINDOWS_MINUTES};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timestamped observation for one sensor.
///
/// Measurement fields are optional; a missing value stays `None` here and is
/// only defaulted by consumers that need a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(alias = "sensorId")]
    pub sensor_id: String,
    /// Epoch seconds
    pub timestamp: i64,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
    pub co2: Option<f64>,
    pub motion: Option<f64>,
    pub light: Option<f64>,
}

impl SensorReading {
    /// Create a reading with no measurements
    pub fn new(sensor_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp,
            humidity: None,
            temperature: None,
            co2: None,
            motion: None,
            light: None,
        }
    }
}

/// Errors raised by the history store and codec
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Empty sensor id")]
    EmptySensorId,
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Decoding failed: {0}")]
    Decode(String),
}
