//! Orchestration, training and prediction on top of the ingested data.

pub mod subsystems;

pub use subsystems::pipeline::{LoadReport, PipelineContext, PipelineError, RunOptions, RunSummary};
pub use subsystems::predict::{HitPredictor, Prediction};
