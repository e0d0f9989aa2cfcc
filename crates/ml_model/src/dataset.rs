//! Dataset and batching for Burn training.

use burn::data::dataset::Dataset;
use burn::prelude::*;
use dataset::NumericArray;

use crate::ModelError;

/// A single labelled row.
#[derive(Debug, Clone)]
pub struct SensorDatasetItem {
    /// Preprocessed feature vector.
    pub features: Vec<f32>,
    /// Encoded class label.
    pub label: u8,
}

/// In-memory dataset over a feature array and its labels.
#[derive(Debug, Clone)]
pub struct SensorDataset {
    features: NumericArray,
    labels: Vec<u8>,
}

impl SensorDataset {
    /// Pairs each row of `features` with its label.
    ///
    /// # Errors
    ///
    /// Returns an error if there is not exactly one label per row.
    pub fn new(features: NumericArray, labels: Vec<u8>) -> Result<Self, ModelError> {
        if features.rows() != labels.len() {
            return Err(ModelError::TargetCount {
                expected: features.rows(),
                actual: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.features.cols()
    }
}

impl Dataset<SensorDatasetItem> for SensorDataset {
    fn get(&self, index: usize) -> Option<SensorDatasetItem> {
        let label = *self.labels.get(index)?;
        Some(SensorDatasetItem {
            features: self.features.row(index).to_vec(),
            label,
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A batch of training data.
#[derive(Debug, Clone)]
pub struct SensorBatch<B: Backend> {
    /// Input features tensor of shape `[batch_size, n_features]`.
    pub inputs: Tensor<B, 2>,
    /// Class indices of shape `[batch_size]`.
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher for creating training batches.
#[derive(Debug, Clone)]
pub struct SensorBatcher<B: Backend> {
    device: B::Device,
    n_features: usize,
}

impl<B: Backend> SensorBatcher<B> {
    /// Creates a new batcher for the given device.
    #[must_use]
    pub const fn new(device: B::Device, n_features: usize) -> Self {
        Self { device, n_features }
    }

    /// Creates a batch from a vector of items.
    pub fn batch(&self, items: Vec<SensorDatasetItem>) -> SensorBatch<B> {
        let batch_size = items.len();

        let mut features_data = Vec::with_capacity(batch_size * self.n_features);
        let mut targets_data = Vec::with_capacity(batch_size);

        for item in items {
            features_data.extend_from_slice(&item.features);
            targets_data.push(i64::from(item.label));
        }

        let inputs = Tensor::<B, 2>::from_data(
            TensorData::new(features_data, [batch_size, self.n_features]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets_data, [batch_size]),
            &self.device,
        );

        SensorBatch { inputs, targets }
    }
}

/// Moves a whole feature array onto `device` as one tensor.
pub fn features_tensor<B: Backend>(features: &NumericArray, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 2>::from_data(
        TensorData::new(features.data().to_vec(), [features.rows(), features.cols()]),
        device,
    )
}
