//! Batch training pipeline for the APS sensor fault classifier.
//!
//! Stages run strictly in order: ingestion, validation, transformation,
//! training, evaluation and promotion. Each stage hands an immutable artifact
//! to the next, and the first failure ends the run.

pub mod components;
mod error;
mod pipeline;
mod stage;
mod stats;
mod status;

pub use error::SensorError;
pub use pipeline::{PipelineOptions, PipelineRun, TrainPipeline};
pub use stage::Stage;
pub use stats::{KsTest, ks_2samp};
pub use status::{CancellationToken, PipelineStatus, RunGuard};
