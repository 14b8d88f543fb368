//! Measurement Payload Flattening
//!
//! Upstream payloads group measurements by sensor:
//!
//! ```json
//! { "responseData": [ { "sensorId": "sensor81", "measurements": [ { "timestamp": ..., "co2": 612.0 } ] } ] }
//! ```
//!
//! Each measurement becomes one [`SensorReading`]. Malformed records are
//! logged and skipped.

use crate::error::IngestError;
use chrono::DateTime;
use sensor_history::SensorReading;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Data key used by the bulk measurement endpoint
pub const RESPONSE_DATA_KEY: &str = "responseData";

/// Data key the single-sensor endpoint may answer with
pub const REQUEST_DATA_KEY: &str = "requestData";

#[derive(Debug, Deserialize)]
struct MeasurementBlock {
    #[serde(rename = "sensorId", default)]
    sensor_id: Option<String>,
    #[serde(default)]
    measurements: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawMeasurement {
    timestamp: Option<RawTimestamp>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    co2: Option<f64>,
    #[serde(default)]
    motion: Option<f64>,
    #[serde(default)]
    light: Option<f64>,
}

/// Epoch seconds that map to a calendar date
fn representable(seconds: i64) -> Result<i64, IngestError> {
    DateTime::from_timestamp(seconds, 0)
        .map(|_| seconds)
        .ok_or_else(|| IngestError::InvalidTimestamp(seconds.to_string()))
}

/// Parse an upstream timestamp: epoch seconds (number or numeric string) or
/// RFC 3339 text
pub fn parse_timestamp(raw: &str) -> Result<i64, IngestError> {
    let trimmed = raw.trim();
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return representable(seconds);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.timestamp())
        .map_err(|_| IngestError::InvalidTimestamp(raw.to_string()))
}

fn timestamp_of(raw: Option<RawTimestamp>) -> Result<i64, IngestError> {
    match raw {
        Some(RawTimestamp::Seconds(s)) => representable(s),
        // `as` saturates, so the range is checked before the cast
        Some(RawTimestamp::Fractional(f))
            if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            representable(f.floor() as i64)
        }
        Some(RawTimestamp::Fractional(f)) => Err(IngestError::InvalidTimestamp(f.to_string())),
        Some(RawTimestamp::Text(text)) => parse_timestamp(&text),
        None => Err(IngestError::MissingField("timestamp")),
    }
}

/// Decode one measurement object of a sensor block
pub fn parse_measurement(sensor_id: &str, value: Value) -> Result<SensorReading, IngestError> {
    let raw: RawMeasurement =
        serde_json::from_value(value).map_err(|e| IngestError::InvalidFormat(e.to_string()))?;

    Ok(SensorReading {
        sensor_id: sensor_id.to_string(),
        timestamp: timestamp_of(raw.timestamp)?,
        humidity: raw.humidity,
        temperature: raw.temperature,
        co2: raw.co2,
        motion: raw.motion,
        light: raw.light,
    })
}

fn blocks_of(payload: Value, data_key: &str) -> Vec<Value> {
    match payload {
        Value::Array(blocks) => blocks,
        Value::Object(mut map) => match map.remove(data_key) {
            Some(Value::Array(blocks)) => blocks,
            Some(other) => {
                warn!("Payload key {} is not a list: {}", data_key, other);
                Vec::new()
            }
            None => Vec::new(),
        },
        other => {
            warn!("Unexpected payload shape: {}", other);
            Vec::new()
        }
    }
}

/// Data key to read from a single-sensor response
pub fn sensor_data_key(payload: &Value) -> &'static str {
    if payload.get(REQUEST_DATA_KEY).is_some() {
        REQUEST_DATA_KEY
    } else {
        RESPONSE_DATA_KEY
    }
}

/// Flatten a measurement payload into readings.
///
/// Blocks without a sensor id and measurements that fail to decode are
/// skipped with a warning.
pub fn flatten_measurements(payload: Value, data_key: &str) -> Vec<SensorReading> {
    let mut readings = Vec::new();
    let mut skipped = 0usize;

    for block in blocks_of(payload, data_key) {
        let block: MeasurementBlock = match serde_json::from_value(block) {
            Ok(block) => block,
            Err(e) => {
                warn!("Skipping malformed measurement block: {}", e);
                skipped += 1;
                continue;
            }
        };

        let sensor_id = match block.sensor_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                warn!("Skipping block: {}", IngestError::MissingField("sensorId"));
                skipped += 1;
                continue;
            }
        };

        for measurement in block.measurements {
            match parse_measurement(&sensor_id, measurement) {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    warn!("Skipping measurement of {}: {}", sensor_id, e);
                    skipped += 1;
                }
            }
        }
    }

    debug!(
        "Flattened {} readings ({} records skipped)",
        readings.len(),
        skipped
    );
    readings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_response_data() {
        let payload = json!({
            "responseData": [
                {"sensorId": "sensor81", "measurements": [
                    {"timestamp": 1714521600, "humidity": 30.0, "co2": 600.0, "motion": 1.0},
                    {"timestamp": 1714521900, "humidity": 31.0, "co2": 605.0, "motion": 0.0}
                ]},
                {"sensorId": "sensor82", "measurements": [
                    {"timestamp": "2024-05-01T00:00:00Z", "temperature": 21.0}
                ]}
            ]
        });

        let readings = flatten_measurements(payload, RESPONSE_DATA_KEY);
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].sensor_id, "sensor81");
        assert_eq!(readings[1].co2, Some(605.0));
        assert_eq!(readings[2].sensor_id, "sensor82");
        assert_eq!(readings[2].timestamp, 1_714_521_600);
        assert_eq!(readings[2].temperature, Some(21.0));
        assert_eq!(readings[2].humidity, None);
    }

    #[test]
    fn test_bare_list_payload() {
        let payload = json!([
            {"sensorId": "s1", "measurements": [{"timestamp": 10, "light": null}]}
        ]);
        let readings = flatten_measurements(payload, RESPONSE_DATA_KEY);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].light, None);
    }

    #[test]
    fn test_skips_blocks_without_sensor_id() {
        let payload = json!({
            "responseData": [
                {"measurements": [{"timestamp": 1}]},
                {"sensorId": "", "measurements": [{"timestamp": 2}]},
                {"sensorId": "ok", "measurements": [{"timestamp": 3}]}
            ]
        });
        let readings = flatten_measurements(payload, RESPONSE_DATA_KEY);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor_id, "ok");
    }

    #[test]
    fn test_skips_malformed_measurements() {
        let payload = json!({
            "responseData": [
                {"sensorId": "s1", "measurements": [
                    {"timestamp": "yesterday"},
                    {"co2": 500.0},
                    {"timestamp": 5, "co2": "lots"},
                    {"timestamp": "1714521600", "co2": 500.0}
                ]}
            ]
        });
        let readings = flatten_measurements(payload, RESPONSE_DATA_KEY);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].timestamp, 1_714_521_600);
    }

    #[test]
    fn test_request_data_key() {
        let payload = json!({
            "requestData": [{"sensorId": "s1", "measurements": [{"timestamp": 1}]}]
        });
        let key = sensor_data_key(&payload);
        assert_eq!(key, REQUEST_DATA_KEY);
        assert_eq!(flatten_measurements(payload, key).len(), 1);
        assert_eq!(sensor_data_key(&json!({"responseData": []})), RESPONSE_DATA_KEY);
    }

    #[test]
    fn test_missing_data_key_is_empty() {
        assert!(flatten_measurements(json!({"other": []}), RESPONSE_DATA_KEY).is_empty());
        assert!(flatten_measurements(json!("nope"), RESPONSE_DATA_KEY).is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("42").unwrap(), 42);
        assert_eq!(
            parse_timestamp("2024-05-01T02:00:00+02:00").unwrap(),
            1_714_521_600
        );
        assert!(matches!(
            parse_timestamp("01/05/2024"),
            Err(IngestError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_fractional_timestamp_truncates() {
        let reading = parse_measurement("s", json!({"timestamp": 100.75})).unwrap();
        assert_eq!(reading.timestamp, 100);
    }

    #[test]
    fn test_rejects_timestamps_outside_calendar_range() {
        assert!(matches!(
            parse_measurement("s", json!({"timestamp": 1e300})),
            Err(IngestError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_measurement("s", json!({"timestamp": i64::MAX})),
            Err(IngestError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_timestamp(&i64::MIN.to_string()),
            Err(IngestError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_timestamp("9223372036854775807"),
            Err(IngestError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_out_of_range_record_skipped_without_dropping_others() {
        let payload = json!([
            {"sensorId": "bad", "measurements": [
                {"timestamp": 1e300, "co2": 600.0},
                {"timestamp": i64::MAX, "co2": 600.0}
            ]},
            {"sensorId": "good", "measurements": [{"timestamp": 1714521600, "co2": 610.0}]}
        ]);

        let readings = flatten_measurements(payload, RESPONSE_DATA_KEY);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor_id, "good");
        assert_eq!(readings[0].timestamp, 1_714_521_600);
    }
}
