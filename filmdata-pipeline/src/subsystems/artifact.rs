//! On-disk form of the trained classifier: one pretty-printed JSON file.

use filmdata_core::TrainedClassifierArtifact;
use std::path::Path;
use thiserror::Error;

use crate::subsystems::train::FEATURE_NAMES;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("No trained model at {path}; run `filmdata train` first")]
    Missing { path: String },

    #[error("Trained model at {path} is unreadable: {message}")]
    Corrupt { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn save_artifact(artifact: &TrainedClassifierArtifact, path: &Path) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let body = serde_json::to_vec_pretty(artifact).map_err(|e| ArtifactError::Corrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, body)?;

    tracing::info!(path = %path.display(), "Saved trained model");
    Ok(())
}

pub fn load_artifact(path: &Path) -> Result<TrainedClassifierArtifact, ArtifactError> {
    let body = match std::fs::read(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing {
                path: path.display().to_string(),
            })
        }
        Err(e) => return Err(ArtifactError::Io(e)),
    };

    let artifact: TrainedClassifierArtifact =
        serde_json::from_slice(&body).map_err(|e| ArtifactError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    // predict() feeds inputs positionally in this order
    if !artifact.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES) {
        return Err(ArtifactError::Corrupt {
            path: path.display().to_string(),
            message: format!(
                "features {:?} do not match expected {:?}",
                artifact.feature_names, FEATURE_NAMES
            ),
        });
    }

    let width = artifact.feature_names.len();
    if artifact.scaler.mean.len() != width
        || artifact.scaler.scale.len() != width
        || artifact.model.coefficients.len() != width
    {
        return Err(ArtifactError::Corrupt {
            path: path.display().to_string(),
            message: format!("parameter lengths do not match {} features", width),
        });
    }

    Ok(artifact)
}
