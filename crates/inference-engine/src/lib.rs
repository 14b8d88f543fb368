//! State Inference
//!
//! Key/value classifier interface over feature vectors, an ONNX artifact
//! runner using tract, and a rule-based mock for development.

mod artifacts;
mod engine;

pub use artifacts::{
    load_classifier, ClassifierConfig, OnnxClassifier, Scaler, UnavailableClassifier, CONFIG_FILE,
    MODEL_FILE,
};
pub use engine::{FeatureMap, MockClassifier, OccupancyState, StateClassifier, StatePrediction};

use thiserror::Error;

/// Errors during state classification
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The vector lacks fields the model expects
    #[error("Missing features for inference: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },
    /// Model files missing, unreadable or corrupt
    #[error("Model artifacts unavailable: {0}")]
    ArtifactUnavailable(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl ClassifierError {
    /// Whether the failure is caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClassifierError::SchemaMismatch { .. })
    }
}
