//! Measurement Ingestion
//!
//! Decodes room-climate API payloads into typed sensor readings at the
//! boundary and provides the measurement sources the service fetches from.

mod error;
mod parser;
mod source;

pub use error::{IngestError, SourceError};
pub use parser::{
    flatten_measurements, parse_measurement, parse_timestamp, sensor_data_key, REQUEST_DATA_KEY,
    RESPONSE_DATA_KEY,
};
pub use source::{HttpMeasurementSource, HttpSourceConfig, MeasurementSource, TimeWindow};
