//! Prediction Routes

use axum::{
    extract::{Query, State},
    Json,
};
use inference_engine::StatePrediction;
use metrics::counter;
use sensor_history::SensorReading;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::features::{build_feature_batch, WindowQuery};
use crate::error::ApiError;
use crate::AppState;

/// State prediction of one sensor
#[derive(Debug, Serialize)]
pub struct PredictionRecord {
    pub sensor_id: String,
    #[serde(flatten)]
    pub prediction: StatePrediction,
}

/// Response for predictions endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<PredictionRecord>,
    pub current_sensors: Vec<SensorReading>,
}

/// Classify the latest feature vector of every sensor in the window
pub async fn get_predictions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let batch = build_feature_batch(&state, &params).await?;

    let predictions = batch
        .feature_vectors
        .iter()
        .map(|vector| -> Result<PredictionRecord, ApiError> {
            let prediction = state.classifier.predict_vector(vector)?;
            debug!(
                "Sensor {} classified as {}",
                vector.sensor_id, prediction.state_label
            );
            Ok(PredictionRecord {
                sensor_id: vector.sensor_id.clone(),
                prediction,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    counter!("predictions_total").increment(predictions.len() as u64);

    Ok(Json(PredictionResponse {
        predictions,
        current_sensors: batch.current_sensors,
    }))
}
