//! Training logic for the sensor classifier.

use anyhow::{Context, bail};
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use dataset::NumericArray;
use tracing::{debug, info};

use crate::dataset::{SensorBatcher, SensorDataset};
use crate::{InferenceBackend, ModelConfig, SensorClassifier, TrainBackend};

/// Configuration for training the model.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Model architecture configuration.
    pub model: ModelConfig,
    /// Learning rate for the optimizer.
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    /// Number of training epochs.
    #[config(default = 30)]
    pub epochs: usize,
    /// Batch size for training.
    #[config(default = 64)]
    pub batch_size: usize,
    /// Seed for weight initialisation and batch order.
    #[config(default = 42)]
    pub seed: u64,
}

/// Output from training.
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    /// Mean cross-entropy of the last epoch.
    pub final_train_loss: f32,
    /// Number of epochs completed.
    pub epochs_completed: usize,
}

/// Initialises a classifier, trains it on `features`/`labels` and returns
/// the inference copy.
///
/// # Errors
///
/// Returns an error if the labels do not match the rows or training fails.
pub fn fit(
    features: &NumericArray,
    labels: &[u8],
    config: &TrainingConfig,
) -> anyhow::Result<(SensorClassifier<InferenceBackend>, TrainingOutput)> {
    let device = Default::default();
    <TrainBackend as Backend>::seed(config.seed);

    let mut model: SensorClassifier<TrainBackend> = config.model.init(&device);
    let dataset = SensorDataset::new(features.clone(), labels.to_vec())
        .context("Failed to build training dataset")?;

    let output = train(&mut model, &dataset, config)?;
    Ok((model.valid(), output))
}

/// Trains the model on the provided data.
///
/// Uses a simple training loop with Adam optimizer and cross-entropy loss.
///
/// # Arguments
///
/// * `model` - The model to train (will be modified in place).
/// * `dataset` - The training data.
/// * `config` - Training configuration.
///
/// # Errors
///
/// Returns an error if there is no data or the feature width is wrong.
pub fn train<B: AutodiffBackend>(
    model: &mut SensorClassifier<B>,
    dataset: &SensorDataset,
    config: &TrainingConfig,
) -> anyhow::Result<TrainingOutput> {
    if dataset.is_empty() {
        bail!("No training data provided");
    }
    if dataset.n_features() != config.model.n_features {
        bail!(
            "Model expects {} features, dataset has {}",
            config.model.n_features,
            dataset.n_features()
        );
    }

    let device = model.linear1.weight.device();
    let batcher = SensorBatcher::<B>::new(device.clone(), dataset.n_features());

    let mut optimizer = AdamConfig::new().init();
    let loss_fn: CrossEntropyLoss<B> = CrossEntropyLossConfig::new().init(&device);
    let mut final_train_loss = 0.0;

    for epoch in 0..config.epochs {
        let mut epoch_loss = 0.0;
        let mut batch_count: u32 = 0;

        let num_samples = dataset.len();
        let mut indices: Vec<usize> = (0..num_samples).collect();
        shuffle_indices(&mut indices, config.seed.wrapping_add(epoch as u64));

        for batch_indices in indices.chunks(config.batch_size.max(1)) {
            let items: Vec<_> = batch_indices
                .iter()
                .filter_map(|&i| dataset.get(i))
                .collect();

            if items.is_empty() {
                continue;
            }

            let batch = batcher.batch(items);

            let logits = model.forward(batch.inputs);
            let loss = loss_fn.forward(logits, batch.targets);

            epoch_loss += f64::from(scalar(loss.clone()));
            batch_count += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, model);

            *model = optimizer.step(config.learning_rate, model.clone(), grads);
        }

        final_train_loss = if batch_count > 0 {
            (epoch_loss / f64::from(batch_count)) as f32
        } else {
            0.0
        };

        if epoch % 10 == 0 || epoch + 1 == config.epochs {
            info!(epoch = epoch + 1, train_loss = final_train_loss, "Training progress");
        } else {
            debug!(epoch = epoch + 1, train_loss = final_train_loss, "Epoch finished");
        }
    }

    Ok(TrainingOutput {
        final_train_loss,
        epochs_completed: config.epochs,
    })
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor
        .into_data()
        .to_vec::<f32>()
        .ok()
        .and_then(|values| values.first().copied())
        .unwrap_or(0.0)
}

/// Shuffles indices using a simple LCG-based shuffle.
fn shuffle_indices(indices: &mut [usize], seed: u64) {
    let mut rng_state = seed.wrapping_add(12345);

    for i in (1..indices.len()).rev() {
        // LCG: state = (a * state + c) mod m
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = ((rng_state >> 33) as usize) % (i + 1);
        indices.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification_score;
    use crate::dataset::features_tensor;

    fn separable(n: usize) -> (NumericArray, Vec<u8>) {
        let mut rows = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let label = u8::from(i % 2 == 0);
            let sign = if label == 1 { 1.0 } else { -1.0 };
            let jitter = (i % 7) as f32 * 0.05;
            rows.push(vec![sign * (1.0 + jitter), sign * 0.5, jitter]);
            labels.push(label);
        }
        (NumericArray::from_rows(3, &rows).expect("array"), labels)
    }

    #[test]
    fn test_training() {
        let (features, labels) = separable(200);
        let config = TrainingConfig::new(ModelConfig::new(3))
            .with_epochs(2)
            .with_batch_size(16);

        let (_, output) = fit(&features, &labels, &config).expect("Training should succeed");
        assert_eq!(output.epochs_completed, 2);
        assert!(output.final_train_loss.is_finite());
    }

    #[test]
    fn test_fit_learns_separable_classes() {
        let (features, labels) = separable(200);
        let config = TrainingConfig::new(ModelConfig::new(3))
            .with_epochs(40)
            .with_batch_size(16)
            .with_learning_rate(1e-2);

        let (model, _) = fit(&features, &labels, &config).expect("fit");
        let predictions = model.classify(features_tensor(&features, &Default::default()));

        let metric = classification_score(&labels, &predictions);
        assert!(metric.f1_score > 0.95, "f1 = {}", metric.f1_score);
    }

    #[test]
    fn test_rejects_feature_width_mismatch() {
        let (features, labels) = separable(10);
        let config = TrainingConfig::new(ModelConfig::new(4)).with_epochs(1);
        assert!(fit(&features, &labels, &config).is_err());
    }

    #[test]
    fn test_shuffle_indices() {
        let mut indices: Vec<usize> = (0..10).collect();
        let original = indices.clone();

        shuffle_indices(&mut indices, 42);

        assert_ne!(indices, original, "Shuffle should change order");

        indices.sort_unstable();
        assert_eq!(indices, original, "Shuffle should preserve elements");
    }
}
