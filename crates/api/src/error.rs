//! API Error Responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use feature_engine::FeatureError;
use inference_engine::ClassifierError;
use ingestion::SourceError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Request failures, rendered as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("start ({start}) must be before end ({end})")]
    InvalidWindow { start: i64, end: i64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream measurement API unavailable: {0}")]
    Upstream(#[from] SourceError),

    #[error("Invalid upstream data: {0}")]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidWindow { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Feature(_) => StatusCode::BAD_GATEWAY,
            ApiError::Classifier(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Classifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status.as_u16(), self);
        } else {
            warn!("Request rejected with {}: {}", status.as_u16(), self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
