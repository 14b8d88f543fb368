//! Reading Codec
//!
//! Serializes reading batches for shipping history snapshots between
//! processes, either as JSON or as compact postcard bytes.

use crate::{HistoryError, SensorReading};
use serde::{Deserialize, Serialize};

/// Wire format for encoded readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Json,
    Postcard,
}

/// Encoder/decoder for reading batches
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingCodec {
    format: WireFormat,
}

impl ReadingCodec {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Encode a batch of readings
    pub fn encode(&self, readings: &[SensorReading]) -> Result<Vec<u8>, HistoryError> {
        match self.format {
            WireFormat::Json => {
                serde_json::to_vec(readings).map_err(|e| HistoryError::Encode(e.to_string()))
            }
            WireFormat::Postcard => {
                postcard::to_allocvec(readings).map_err(|e| HistoryError::Encode(e.to_string()))
            }
        }
    }

    /// Decode a batch of readings
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<SensorReading>, HistoryError> {
        match self.format {
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| HistoryError::Decode(e.to_string()))
            }
            WireFormat::Postcard => {
                postcard::from_bytes(bytes).map_err(|e| HistoryError::Decode(e.to_string()))
            }
        }
    }
}
