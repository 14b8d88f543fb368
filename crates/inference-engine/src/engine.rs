//! Classifier Interface

use crate::ClassifierError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Feature name to value mapping handed to a classifier
pub type FeatureMap<'a> = HashMap<&'a str, f64>;

/// Classification of one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePrediction {
    /// Index of the most probable state
    pub state: usize,
    pub state_label: String,
    /// Probability per state label
    pub state_probabilities: BTreeMap<String, f64>,
}

impl StatePrediction {
    /// Pick the most probable state; `label` names state indices
    pub fn from_probabilities<F>(probabilities: &[f64], label: F) -> Result<Self, ClassifierError>
    where
        F: Fn(usize) -> String,
    {
        let state = probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .ok_or_else(|| ClassifierError::InferenceFailed("empty probability output".into()))?;

        Ok(Self {
            state,
            state_label: label(state),
            state_probabilities: probabilities
                .iter()
                .enumerate()
                .map(|(idx, &p)| (label(idx), p))
                .collect(),
        })
    }
}

/// Predicts a discrete state from a feature mapping
pub trait StateClassifier: Send + Sync {
    /// Ordered feature names the model consumes
    fn feature_cols(&self) -> &[String];

    fn predict(&self, features: &FeatureMap<'_>) -> Result<StatePrediction, ClassifierError>;

    /// Classify a full feature vector
    fn predict_vector(&self, vector: &FeatureVector) -> Result<StatePrediction, ClassifierError> {
        let features: FeatureMap<'_> = vector.feature_map().into_iter().collect();
        debug!(
            "Classifying {} with {} features",
            vector.sensor_id,
            features.len()
        );
        self.predict(&features)
    }

    /// Values of `feature_cols` in order, or the names that are missing
    fn ordered_values(&self, features: &FeatureMap<'_>) -> Result<Vec<f64>, ClassifierError> {
        let missing: Vec<String> = self
            .feature_cols()
            .iter()
            .filter(|col| !features.contains_key(col.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ClassifierError::SchemaMismatch { missing });
        }

        Ok(self
            .feature_cols()
            .iter()
            .filter_map(|col| features.get(col.as_str()).copied())
            .collect())
    }
}

/// States produced by the mock classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupancyState {
    Vacant,
    Occupied,
    Ventilating,
}

impl OccupancyState {
    pub const ALL: [OccupancyState; 3] = [
        OccupancyState::Vacant,
        OccupancyState::Occupied,
        OccupancyState::Ventilating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyState::Vacant => "vacant",
            OccupancyState::Occupied => "occupied",
            OccupancyState::Ventilating => "ventilating",
        }
    }
}

/// Rule-based classifier for development without model artifacts
pub struct MockClassifier {
    feature_cols: Vec<String>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            feature_cols: [
                "recent_motion_10m",
                "count_motion_30m",
                "residual_co2",
                "delta_5m_co2",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StateClassifier for MockClassifier {
    fn feature_cols(&self) -> &[String] {
        &self.feature_cols
    }

    fn predict(&self, features: &FeatureMap<'_>) -> Result<StatePrediction, ClassifierError> {
        let values = self.ordered_values(features)?;
        let (recent_motion, motion_count, residual_co2, delta_co2) =
            (values[0], values[1], values[2], values[3]);

        let probabilities = if recent_motion > 0.0 || residual_co2 > 50.0 {
            let conf = (0.6 + motion_count * 0.05 + residual_co2.max(0.0) / 500.0).clamp(0.6, 0.95);
            let rest = (1.0 - conf) / 2.0;
            [rest, conf, rest]
        } else if delta_co2 < -5.0 {
            let conf = (0.6 + (-delta_co2 - 5.0) / 50.0).clamp(0.6, 0.9);
            let rest = (1.0 - conf) / 2.0;
            [rest, rest, conf]
        } else {
            [0.9, 0.05, 0.05]
        };

        StatePrediction::from_probabilities(&probabilities, |idx| {
            OccupancyState::ALL
                .get(idx)
                .map_or_else(|| format!("State {idx}"), |s| s.as_str().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::FeatureExtractor;
    use sensor_history::SensorReading;

    fn features(recent: f64, count: f64, residual: f64, delta: f64) -> FeatureMap<'static> {
        HashMap::from([
            ("recent_motion_10m", recent),
            ("count_motion_30m", count),
            ("residual_co2", residual),
            ("delta_5m_co2", delta),
        ])
    }

    #[test]
    fn test_mock_vacant() {
        let prediction = MockClassifier::new()
            .predict(&features(0.0, 0.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(prediction.state, 0);
        assert_eq!(prediction.state_label, "vacant");
        assert_eq!(prediction.state_probabilities.len(), 3);
    }

    #[test]
    fn test_mock_occupied() {
        let prediction = MockClassifier::new()
            .predict(&features(1.0, 4.0, 80.0, 2.0))
            .unwrap();
        assert_eq!(prediction.state_label, "occupied");
        assert!(prediction.state_probabilities["occupied"] > 0.5);
        let total: f64 = prediction.state_probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mock_ventilating() {
        let prediction = MockClassifier::new()
            .predict(&features(0.0, 0.0, -30.0, -12.0))
            .unwrap();
        assert_eq!(prediction.state, 2);
        assert_eq!(prediction.state_label, "ventilating");
    }

    #[test]
    fn test_schema_mismatch_lists_missing_fields() {
        let partial: FeatureMap<'_> = HashMap::from([("recent_motion_10m", 1.0)]);
        let err = MockClassifier::new().predict(&partial).unwrap_err();
        assert!(err.is_client_error());
        match err {
            ClassifierError::SchemaMismatch { missing } => {
                assert_eq!(missing, vec!["count_motion_30m", "residual_co2", "delta_5m_co2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_predict_vector() {
        let series: Vec<SensorReading> = (0..4)
            .map(|i| SensorReading {
                co2: Some(600.0),
                motion: Some(1.0),
                ..SensorReading::new("room", 1_714_521_600 + i * 300)
            })
            .collect();
        let vector = FeatureExtractor::default()
            .extract_series(&series)
            .unwrap()
            .unwrap();

        let prediction = MockClassifier::new().predict_vector(&vector).unwrap();
        assert_eq!(prediction.state_label, "occupied");
    }

    #[test]
    fn test_from_probabilities_labels() {
        let prediction =
            StatePrediction::from_probabilities(&[0.1, 0.2, 0.7], |i| format!("State {i}")).unwrap();
        assert_eq!(prediction.state, 2);
        assert_eq!(prediction.state_label, "State 2");
        assert_eq!(prediction.state_probabilities["State 0"], 0.1);

        assert!(StatePrediction::from_probabilities(&[], |i| i.to_string()).is_err());
    }
}
