//! Hit-predictor training
//!
//! Features: `budget` and `release_month`. Label: `revenue > t × budget`
//! for the first threshold `t` (tried in descending order) that produces
//! both hits and flops.
//!
//! Model: L2-regularized logistic regression on standardized features,
//! fitted by batch gradient descent on
//!
//!   mean(log_loss) + ||w||² / (2 × C × n)
//!
//! which has the same minimizer as the usual `C`-weighted formulation.
//! The intercept is not penalized.

use chrono::{Datelike, NaiveDate, Utc};
use filmdata_core::config::TrainingConfig;
use filmdata_core::models::{
    ClassifierParams, MovieRecord, ScalerParams, TrainedClassifierArtifact, TrainingMetrics,
};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::subsystems::artifact::ArtifactError;
use filmdata_ingest::StoreError;

pub const FEATURE_NAMES: [&str; 2] = ["budget", "release_month"];

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("No profitability threshold in {thresholds:?} produced both hits and flops")]
    DegenerateLabels { thresholds: Vec<f64> },

    #[error("Need at least 2 movies with budget, release month and revenue, found {usable}")]
    InsufficientData { usable: usize },

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// Feature engineering
// ============================================================================

/// One movie reduced to what training needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub budget: f64,
    pub release_month: u32,
    pub revenue: f64,
}

pub fn release_month(date: &str) -> Option<u32> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.month())
}

/// Drop every movie missing budget, release month or revenue.
pub fn usable_samples(records: &[MovieRecord]) -> Vec<Sample> {
    records
        .iter()
        .filter_map(|m| {
            Some(Sample {
                budget: m.budget?,
                release_month: m.release_date.as_deref().and_then(release_month)?,
                revenue: m.revenue?,
            })
        })
        .collect()
}

/// First threshold whose labels contain both classes, with those labels.
pub fn select_threshold(
    samples: &[Sample],
    thresholds: &[f64],
) -> Result<(f64, Vec<bool>), TrainingError> {
    for &t in thresholds {
        let labels: Vec<bool> = samples.iter().map(|s| s.revenue > t * s.budget).collect();
        let hits = labels.iter().filter(|&&hit| hit).count();

        if hits > 0 && hits < labels.len() {
            tracing::info!(threshold = t, hits, flops = labels.len() - hits, "Using profitability threshold");
            return Ok((t, labels));
        }
        tracing::info!(threshold = t, hits, total = labels.len(), "Only one class at threshold");
    }

    Err(TrainingError::DegenerateLabels {
        thresholds: thresholds.to_vec(),
    })
}

/// Seeded shuffle, then the first `ceil(n × test_fraction)` indices are
/// held out. At least one row always stays in the training split.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((n as f64) * test_fraction.clamp(0.0, 1.0) - 1e-9).ceil().max(0.0) as usize;
    let test_len = test_len.min(n.saturating_sub(1));
    let train = indices.split_off(test_len);
    (train, indices)
}

fn feature_matrix(samples: &[Sample]) -> Array2<f64> {
    Array2::from_shape_fn((samples.len(), FEATURE_NAMES.len()), |(i, j)| match j {
        0 => samples[i].budget,
        _ => samples[i].release_month as f64,
    })
}

// ============================================================================
// Scaler + classifier
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Population standard deviation; a constant column gets scale 1.
    pub fn fit(x: &Array2<f64>) -> Self {
        let width = x.ncols();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(width));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    pub iterations: usize,
}

impl LogisticRegression {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &TrainingConfig) -> Self {
        let n = x.nrows().max(1) as f64;
        let penalty = 1.0 / (config.regularization.max(f64::EPSILON) * n);

        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;
        let mut iterations = config.max_iterations;

        for iter in 0..config.max_iterations {
            let p = (x.dot(&w) + b).mapv(sigmoid);
            let err = &p - y;

            let grad_w = x.t().dot(&err) / n + &w * penalty;
            let grad_b = err.sum() / n;

            let norm = (grad_w.dot(&grad_w) + grad_b * grad_b).sqrt();
            if norm < config.tolerance {
                iterations = iter;
                break;
            }

            w = w - &grad_w * config.learning_rate;
            b -= config.learning_rate * grad_b;
        }

        Self {
            coefficients: w,
            intercept: b,
            iterations,
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        (x.dot(&self.coefficients) + self.intercept).mapv(sigmoid)
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Train the hit predictor from movie records.
pub fn train(
    records: &[MovieRecord],
    config: &TrainingConfig,
) -> Result<TrainedClassifierArtifact, TrainingError> {
    let samples = usable_samples(records);
    tracing::info!(total = records.len(), usable = samples.len(), "Prepared training samples");

    if samples.len() < 2 {
        return Err(TrainingError::InsufficientData {
            usable: samples.len(),
        });
    }

    let (threshold, labels) = select_threshold(&samples, &config.thresholds)?;

    let x = feature_matrix(&samples);
    let y = Array1::from_iter(labels.iter().map(|&hit| if hit { 1.0 } else { 0.0 }));

    let (train_idx, test_idx) = split_indices(samples.len(), config.test_fraction, config.seed);
    let x_train = x.select(Axis(0), &train_idx);
    let y_train = y.select(Axis(0), &train_idx);

    let scaler = StandardScaler::fit(&x_train);
    let model = LogisticRegression::fit(&scaler.transform(&x_train), &y_train, config);

    let test_accuracy = if test_idx.is_empty() {
        None
    } else {
        let x_test = scaler.transform(&x.select(Axis(0), &test_idx));
        let y_test = y.select(Axis(0), &test_idx);
        let correct = model
            .predict_proba(&x_test)
            .iter()
            .zip(y_test.iter())
            .filter(|(p, label)| (**p >= 0.5) == (**label >= 0.5))
            .count();
        Some(correct as f64 / test_idx.len() as f64)
    };

    tracing::info!(
        threshold,
        train = train_idx.len(),
        test = test_idx.len(),
        accuracy = ?test_accuracy,
        iterations = model.iterations,
        "Trained hit predictor"
    );

    Ok(TrainedClassifierArtifact {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        scaler: ScalerParams {
            mean: scaler.mean.to_vec(),
            scale: scaler.scale.to_vec(),
        },
        model: ClassifierParams {
            coefficients: model.coefficients.to_vec(),
            intercept: model.intercept,
        },
        profitability_threshold: threshold,
        metrics: TrainingMetrics {
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
            test_accuracy,
            iterations: model.iterations,
        },
        trained_at: Utc::now(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
