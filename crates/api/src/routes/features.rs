//! Feature Vector Routes

use axum::{
    extract::{Query, State},
    Json,
};
use feature_engine::{latest_readings, FeatureVector};
use ingestion::{parse_timestamp, TimeWindow};
use metrics::counter;
use sensor_history::SensorReading;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::AppState;

/// Query parameters shared by the feature and prediction endpoints
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    /// Window start, epoch seconds or RFC 3339
    pub start: Option<String>,
    /// Window end, epoch seconds or RFC 3339; defaults to now
    pub end: Option<String>,
    /// Restrict the result to one sensor
    pub sensor_id: Option<String>,
}

impl WindowQuery {
    /// Resolve the requested window; `start` defaults to `end - default_hours`
    pub fn window(&self, now: i64, default_hours: u32) -> Result<TimeWindow, ApiError> {
        let end = match &self.end {
            Some(raw) => parse_bound(raw)?,
            None => now,
        };
        let window = match &self.start {
            Some(raw) => TimeWindow::new(parse_bound(raw)?, end),
            None => TimeWindow::trailing_hours(end, default_hours),
        };

        if !window.is_valid() {
            return Err(ApiError::InvalidWindow {
                start: window.start,
                end: window.end,
            });
        }
        Ok(window)
    }
}

fn parse_bound(raw: &str) -> Result<i64, ApiError> {
    parse_timestamp(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Vectors of one request plus the latest raw reading per sensor
#[derive(Debug, Serialize)]
pub struct FeatureVectorResponse {
    pub feature_vectors: Vec<FeatureVector>,
    pub current_sensors: Vec<SensorReading>,
}

/// Fetch readings for the query window and extract one vector per sensor
pub async fn build_feature_batch(
    state: &AppState,
    query: &WindowQuery,
) -> Result<FeatureVectorResponse, ApiError> {
    let window = query.window(chrono::Utc::now().timestamp(), state.default_window_hours)?;
    let sensor_id = query.sensor_id.as_deref().filter(|id| !id.is_empty());

    let mut readings = state.source.fetch(window, sensor_id).await.map_err(|e| {
        counter!("upstream_failures_total").increment(1);
        ApiError::from(e)
    })?;
    counter!("readings_ingested_total").increment(readings.len() as u64);

    if let Some(id) = sensor_id {
        let before = readings.len();
        readings.retain(|r| r.sensor_id == id);
        if readings.len() < before {
            warn!(
                "Dropped {} readings of other sensors from response for {}",
                before - readings.len(),
                id
            );
        }
    }

    if readings.is_empty() {
        return Err(ApiError::NotFound(
            "No measurements found for the requested window".to_string(),
        ));
    }

    let feature_vectors = state.extractor.extract_batch(&readings)?;
    if feature_vectors.is_empty() {
        return Err(ApiError::NotFound("No feature vectors produced".to_string()));
    }
    counter!("feature_vectors_built_total").increment(feature_vectors.len() as u64);

    info!(
        "Built {} feature vectors from {} readings (window {}..{})",
        feature_vectors.len(),
        readings.len(),
        window.start,
        window.end
    );

    Ok(FeatureVectorResponse {
        feature_vectors,
        current_sensors: latest_readings(&readings),
    })
}

/// Get feature vectors
pub async fn get_feature_vectors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<FeatureVectorResponse>, ApiError> {
    build_feature_batch(&state, &params).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> WindowQuery {
        WindowQuery {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            sensor_id: None,
        }
    }

    #[test]
    fn test_default_window() {
        let window = query(None, None).window(20_000, 3).unwrap();
        assert_eq!(window, TimeWindow::new(20_000 - 10_800, 20_000));
    }

    #[test]
    fn test_explicit_bounds() {
        let window = query(Some("2024-05-01T00:00:00Z"), Some("1714525200"))
            .window(0, 3)
            .unwrap();
        assert_eq!(window, TimeWindow::new(1_714_521_600, 1_714_525_200));
    }

    #[test]
    fn test_rejects_inverted_and_malformed_bounds() {
        assert!(matches!(
            query(Some("200"), Some("100")).window(0, 3),
            Err(ApiError::InvalidWindow { start: 200, end: 100 })
        ));
        assert!(matches!(
            query(Some("100"), Some("100")).window(0, 3),
            Err(ApiError::InvalidWindow { .. })
        ));
        assert!(matches!(
            query(Some("yesterday"), None).window(0, 3),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_extreme_end_bound_is_rejected() {
        assert!(matches!(
            query(None, Some("-9223372036854775808")).window(0, 3),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            query(None, None).window(i64::MIN, 3),
            Err(ApiError::InvalidWindow { .. })
        ));
    }
}
