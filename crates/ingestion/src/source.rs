//! Measurement Sources

use crate::error::SourceError;
use crate::parser::{flatten_measurements, sensor_data_key, RESPONSE_DATA_KEY};
use async_trait::async_trait;
use sensor_history::SensorReading;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Requested time range in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Window of `hours` ending at `end`
    pub fn trailing_hours(end: i64, hours: u32) -> Self {
        Self {
            start: end.saturating_sub(i64::from(hours) * 3600),
            end,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

/// Supplier of sensor readings for a time window
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Readings within `window`, optionally restricted to one sensor
    async fn fetch(
        &self,
        window: TimeWindow,
        sensor_id: Option<&str>,
    ) -> Result<Vec<SensorReading>, SourceError>;
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Base URL of the room-climate API (no trailing slash)
    pub base_url: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
    /// `format` query parameter forwarded upstream
    pub format: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hm-sense-open-data-api.kube.cs.hm.edu/api".to_string(),
            timeout_secs: 30,
            format: "json".to_string(),
        }
    }
}

/// Measurement source backed by the remote room-climate REST API
pub struct HttpMeasurementSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
}

impl HttpMeasurementSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        info!(
            "Measurement client initialized: base_url={} timeout={}s format={}",
            config.base_url, config.timeout_secs, config.format
        );

        Ok(Self {
            client,
            config: HttpSourceConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let started = Instant::now();
        debug!("Requesting {} params={:?}", url, params);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| {
                error!("Request failure for {}: {}", url, e);
                SourceError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP error for {} status={}", url, status.as_u16());
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::Payload(e.to_string()))?;
        debug!(
            "Successful response {} status={} duration={}ms",
            url,
            status.as_u16(),
            started.elapsed().as_millis()
        );
        Ok(payload)
    }

    fn window_params(&self, window: TimeWindow) -> Vec<(&'static str, String)> {
        vec![
            ("start", window.start.to_string()),
            ("end", window.end.to_string()),
            ("format", self.config.format.clone()),
        ]
    }

    /// Sensor ids known to the upstream API
    pub async fn list_sensors(&self) -> Result<Vec<String>, SourceError> {
        let payload = self.get_json("/roomclimate/sensors", &[]).await?;
        match payload {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl MeasurementSource for HttpMeasurementSource {
    async fn fetch(
        &self,
        window: TimeWindow,
        sensor_id: Option<&str>,
    ) -> Result<Vec<SensorReading>, SourceError> {
        let params = self.window_params(window);

        let readings = match sensor_id {
            Some(id) => {
                debug!("Fetching sensor measurements sensor_id={} window={:?}", id, window);
                let payload = self
                    .get_json(&format!("/roomclimate/measurements/{id}"), &params)
                    .await?;
                let key = sensor_data_key(&payload);
                flatten_measurements(payload, key)
            }
            None => {
                debug!("Fetching all measurements window={:?}", window);
                let payload = self
                    .get_json("/roomclimate/measurements/all", &params)
                    .await?;
                flatten_measurements(payload, RESPONSE_DATA_KEY)
            }
        };

        info!(
            "Fetched {} readings for sensor_id={} window={}..{}",
            readings.len(),
            sensor_id.unwrap_or("*"),
            window.start,
            window.end
        );
        Ok(readings)
    }
}
