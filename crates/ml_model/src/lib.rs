//! ML model crate for sensor fault classification.
//!
//! This crate holds the feature preprocessing fitted during transformation,
//! the class-balancing resampler, and a Burn network that classifies APS
//! failures from the preprocessed sensor readings.

pub mod dataset;
mod estimator;
mod metric;
mod preprocess;
mod resample;
pub mod training;

pub use estimator::SensorModel;
pub use metric::classification_score;
pub use preprocess::{FittedPreprocessor, Preprocessor};
pub use resample::SmoteTomek;
pub use training::{TrainingConfig, TrainingOutput, train};

use burn::backend::{Autodiff, NdArray};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Backend used for fitting.
pub type TrainBackend = Autodiff<NdArray>;

/// Backend used for scoring a fitted model.
pub type InferenceBackend = NdArray;

/// Number of output classes (`neg`, `pos`).
pub const NUM_CLASSES: usize = 2;

/// Errors raised while fitting, loading or applying a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("cannot fit on an empty array")]
    EmptyInput,
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("expected {expected} targets, got {actual}")]
    TargetCount { expected: usize, actual: usize },
    #[error("model record error: {0}")]
    Record(String),
    #[error("model bundle error: {0}")]
    Bundle(#[from] serde_json::Error),
    #[error(transparent)]
    Table(#[from] ::dataset::TableError),
}

/// Configuration for the sensor classifier.
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Number of input features.
    pub n_features: usize,
    /// Number of hidden units in the first layer.
    #[config(default = 64)]
    pub hidden_size_1: usize,
    /// Number of hidden units in the second layer.
    #[config(default = 32)]
    pub hidden_size_2: usize,
}

impl ModelConfig {
    /// Creates a new classifier with this configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SensorClassifier<B> {
        SensorClassifier::new(device, self)
    }
}

/// Feedforward network producing one logit per class.
#[derive(Module, Debug)]
pub struct SensorClassifier<B: Backend> {
    linear1: Linear<B>,
    linear2: Linear<B>,
    linear_out: Linear<B>,
    activation: Relu,
}

impl<B: Backend> SensorClassifier<B> {
    /// Creates a new classifier with the given configuration.
    pub fn new(device: &B::Device, config: &ModelConfig) -> Self {
        let linear1 = LinearConfig::new(config.n_features, config.hidden_size_1).init(device);
        let linear2 = LinearConfig::new(config.hidden_size_1, config.hidden_size_2).init(device);
        let linear_out = LinearConfig::new(config.hidden_size_2, NUM_CLASSES).init(device);
        let activation = Relu::new();

        Self {
            linear1,
            linear2,
            linear_out,
            activation,
        }
    }

    /// Forward pass through the network.
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape [`batch_size`, `n_features`]
    ///
    /// # Returns
    ///
    /// Tensor of shape [`batch_size`, `NUM_CLASSES`] containing class logits.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear1.forward(input);
        let x = self.activation.forward(x);
        let x = self.linear2.forward(x);
        let x = self.activation.forward(x);
        self.linear_out.forward(x)
    }

    /// Predicted class (0 or 1) for each row of `input`.
    pub fn classify(&self, input: Tensor<B, 2>) -> Vec<u8> {
        self.forward(input)
            .argmax(1)
            .into_data()
            .iter::<i64>()
            .map(|class| u8::from(class == 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let config = ModelConfig::new(5);
        let model: SensorClassifier<InferenceBackend> = config.init(&device);

        let input = Tensor::<InferenceBackend, 2>::zeros([3, 5], &device);
        assert_eq!(model.forward(input.clone()).dims(), [3, NUM_CLASSES]);

        let classes = model.classify(input);
        assert_eq!(classes.len(), 3);
        assert!(classes.iter().all(|&c| c <= 1));
    }

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::new(170);
        assert_eq!(config.n_features, 170);
        assert_eq!(config.hidden_size_1, 64);
        assert_eq!(config.hidden_size_2, 32);
    }
}
