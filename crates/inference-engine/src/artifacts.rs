//! ONNX Artifact Classifier
//!
//! A model directory holds two files:
//! - `classifier_config.json`: ordered `feature_cols`, `state_labels`
//!   (index to label) and an optional standard `scaler`
//! - `classifier.onnx`: graph taking `[1, n]` f32 input and producing
//!   `[1, k]` class probabilities

use crate::engine::{FeatureMap, MockClassifier, StateClassifier, StatePrediction};
use crate::ClassifierError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tract_onnx::prelude::*;

pub const CONFIG_FILE: &str = "classifier_config.json";
pub const MODEL_FILE: &str = "classifier.onnx";

/// Standardization applied before the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    fn apply(&self, values: &mut [f64]) {
        for ((value, mean), scale) in values.iter_mut().zip(&self.mean).zip(&self.scale) {
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            *value = (*value - mean) / scale;
        }
    }
}

/// Sidecar configuration of a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub feature_cols: Vec<String>,
    #[serde(default)]
    pub state_labels: BTreeMap<usize, String>,
    #[serde(default)]
    pub scaler: Option<Scaler>,
}

impl ClassifierConfig {
    /// Read and validate `classifier_config.json`
    pub fn from_path(path: &Path) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::ArtifactUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let config: ClassifierConfig = serde_json::from_str(&raw).map_err(|e| {
            ClassifierError::ArtifactUnavailable(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.feature_cols.is_empty() {
            return Err(ClassifierError::ArtifactUnavailable(
                "classifier config lists no feature columns".into(),
            ));
        }
        if let Some(scaler) = &self.scaler {
            let n = self.feature_cols.len();
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(ClassifierError::ArtifactUnavailable(format!(
                    "scaler has {}/{} entries for {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    /// Label of a state index; unnamed states become "State {i}"
    pub fn label(&self, idx: usize) -> String {
        self.state_labels
            .get(&idx)
            .cloned()
            .unwrap_or_else(|| format!("State {idx}"))
    }

    /// Scaled model input from ordered feature values
    pub fn prepare_input(&self, mut values: Vec<f64>) -> Vec<f32> {
        if let Some(scaler) = &self.scaler {
            scaler.apply(&mut values);
        }
        values.into_iter().map(|v| v as f32).collect()
    }
}

/// Classifier running a trained ONNX graph with tract
pub struct OnnxClassifier {
    config: ClassifierConfig,
    model: TypedRunnableModel<TypedModel>,
    model_path: PathBuf,
}

impl OnnxClassifier {
    /// Load config and model from `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let dir = dir.as_ref();
        let started = Instant::now();
        let config = ClassifierConfig::from_path(&dir.join(CONFIG_FILE))?;

        let model_path = dir.join(MODEL_FILE);
        if !model_path.is_file() {
            return Err(ClassifierError::ArtifactUnavailable(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let n = config.feature_cols.len();
        let model = tract_onnx::onnx()
            .model_for_path(&model_path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, n]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                ClassifierError::ArtifactUnavailable(format!("{}: {}", model_path.display(), e))
            })?;

        info!(
            "Classifier loaded from {} ({} features, {} labels) in {}ms",
            model_path.display(),
            n,
            config.state_labels.len(),
            started.elapsed().as_millis()
        );

        Ok(Self {
            config,
            model,
            model_path,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn run(&self, input: Vec<f32>) -> TractResult<Vec<f64>> {
        let n = input.len();
        let tensor: Tensor = tract_ndarray::Array2::from_shape_vec((1, n), input)?.into();
        let outputs = self.model.run(tvec!(tensor.into()))?;

        // Probabilities are the last f32 output; label outputs come first
        let probabilities = outputs
            .iter()
            .rev()
            .find_map(|out| out.to_array_view::<f32>().ok())
            .ok_or_else(|| anyhow::anyhow!("model produced no f32 output"))?;
        Ok(probabilities.iter().map(|&p| f64::from(p)).collect())
    }
}

impl StateClassifier for OnnxClassifier {
    fn feature_cols(&self) -> &[String] {
        &self.config.feature_cols
    }

    fn predict(&self, features: &FeatureMap<'_>) -> Result<StatePrediction, ClassifierError> {
        let values = self.ordered_values(features)?;
        let input = self.config.prepare_input(values);

        let started = Instant::now();
        let probabilities = self
            .run(input)
            .map_err(|e| ClassifierError::InferenceFailed(e.to_string()))?;
        debug!("Inference completed in {}ms", started.elapsed().as_millis());

        StatePrediction::from_probabilities(&probabilities, |idx| self.config.label(idx))
    }
}

/// Stand-in for a model directory that failed to load
pub struct UnavailableClassifier {
    reason: String,
}

impl UnavailableClassifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl StateClassifier for UnavailableClassifier {
    fn feature_cols(&self) -> &[String] {
        &[]
    }

    fn predict(&self, _features: &FeatureMap<'_>) -> Result<StatePrediction, ClassifierError> {
        Err(ClassifierError::ArtifactUnavailable(self.reason.clone()))
    }
}

/// Classifier for an optional model directory.
///
/// No directory selects the rule-based mock. A directory whose artifacts
/// fail to load yields a classifier that reports the failure on every call.
pub fn load_classifier(model_dir: Option<&Path>) -> Arc<dyn StateClassifier> {
    match model_dir {
        None => {
            info!("No model directory configured, using mock classifier");
            Arc::new(MockClassifier::new())
        }
        Some(dir) => match OnnxClassifier::load(dir) {
            Ok(classifier) => Arc::new(classifier),
            Err(e) => {
                error!("Failed to load classifier from {}: {}", dir.display(), e);
                Arc::new(UnavailableClassifier::new(e.to_string()))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "inference-engine-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_config_parses_string_label_keys() {
        let config: ClassifierConfig = serde_json::from_str(
            r#"{
                "feature_cols": ["residual_co2", "recent_motion_10m"],
                "state_labels": {"0": "vacant", "1": "occupied"},
                "scaler": {"mean": [10.0, 0.0], "scale": [2.0, 0.0]}
            }"#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.label(1), "occupied");
        assert_eq!(config.label(4), "State 4");
        assert_eq!(config.prepare_input(vec![14.0, 1.0]), vec![2.0f32, 1.0]);
    }

    #[test]
    fn test_scaler_length_mismatch_rejected() {
        let config = ClassifierConfig {
            feature_cols: vec!["a".into(), "b".into()],
            state_labels: BTreeMap::new(),
            scaler: Some(Scaler {
                mean: vec![0.0],
                scale: vec![1.0],
            }),
        };
        assert!(matches!(
            config.validate(),
            Err(ClassifierError::ArtifactUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let err = OnnxClassifier::load("/nonexistent/model-dir").err().unwrap();
        assert!(matches!(err, ClassifierError::ArtifactUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_missing_model_file_is_unavailable() {
        let dir = scratch_dir("no-model");
        fs::write(
            dir.join(CONFIG_FILE),
            r#"{"feature_cols": ["residual_co2"], "state_labels": {"0": "vacant"}}"#,
        )
        .unwrap();

        let err = OnnxClassifier::load(&dir).err().unwrap();
        assert!(err.to_string().contains("model file not found"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_artifacts_are_unavailable() {
        let dir = scratch_dir("corrupt");
        fs::write(dir.join(CONFIG_FILE), "{not json").unwrap();
        assert!(matches!(
            OnnxClassifier::load(&dir),
            Err(ClassifierError::ArtifactUnavailable(_))
        ));

        fs::write(dir.join(CONFIG_FILE), r#"{"feature_cols": ["residual_co2"]}"#).unwrap();
        fs::write(dir.join(MODEL_FILE), b"not an onnx graph").unwrap();
        assert!(matches!(
            OnnxClassifier::load(&dir),
            Err(ClassifierError::ArtifactUnavailable(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_classifier_selection() {
        let mock = load_classifier(None);
        assert_eq!(mock.feature_cols().len(), 4);

        let broken = load_classifier(Some(Path::new("/nonexistent/model-dir")));
        let features: FeatureMap<'_> = std::collections::HashMap::from([("co2", 600.0)]);
        assert!(matches!(
            broken.predict(&features),
            Err(ClassifierError::ArtifactUnavailable(_))
        ));
    }
}
