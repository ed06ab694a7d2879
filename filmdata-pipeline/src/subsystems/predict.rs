//! Read-only consumer of the trained artifact.

use filmdata_core::TrainedClassifierArtifact;
use std::path::Path;

use crate::subsystems::artifact::{load_artifact, ArtifactError};
use crate::subsystems::train::sigmoid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub is_hit: bool,
    /// Probability of the hit class.
    pub probability: f64,
}

#[derive(Debug, Clone)]
pub struct HitPredictor {
    artifact: TrainedClassifierArtifact,
}

impl HitPredictor {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        load_artifact(path).map(Self::from_artifact)
    }

    pub fn from_artifact(artifact: TrainedClassifierArtifact) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &TrainedClassifierArtifact {
        &self.artifact
    }

    /// Score one movie. Inputs follow the artifact's feature order
    /// (`budget`, `release_month`).
    pub fn predict(&self, budget: f64, release_month: u32) -> Prediction {
        let raw = [budget, release_month as f64];
        let scaler = &self.artifact.scaler;
        let model = &self.artifact.model;

        let z = raw
            .iter()
            .zip(scaler.mean.iter().zip(scaler.scale.iter()))
            .zip(model.coefficients.iter())
            .map(|((x, (mean, scale)), w)| (x - mean) / scale * w)
            .sum::<f64>()
            + model.intercept;

        let probability = sigmoid(z);
        Prediction {
            is_hit: probability >= 0.5,
            probability,
        }
    }

    /// `(feature, coefficient)` pairs on the standardized scale.
    pub fn feature_weights(&self) -> Vec<(String, f64)> {
        self.artifact
            .feature_names
            .iter()
            .cloned()
            .zip(self.artifact.model.coefficients.iter().copied())
            .collect()
    }
}
