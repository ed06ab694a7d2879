use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the presentation side needs to score a movie, written once
/// per training run and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedClassifierArtifact {
    /// Feature order shared by `scaler` and `model.coefficients`.
    pub feature_names: Vec<String>,
    pub scaler: ScalerParams,
    pub model: ClassifierParams,
    /// Revenue > threshold × budget defined a hit for this run.
    pub profitability_threshold: f64,
    pub metrics: TrainingMetrics,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_samples: usize,
    pub test_samples: usize,
    /// `None` when the held-out split is empty.
    pub test_accuracy: Option<f64>,
    pub iterations: usize,
}
