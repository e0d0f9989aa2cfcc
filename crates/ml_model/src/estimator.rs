//! The deployable model: fitted preprocessing plus classifier weights.

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use dataset::{NumericArray, Table};
use serde::{Deserialize, Serialize};

use crate::dataset::features_tensor;
use crate::{InferenceBackend, ModelConfig, ModelError, Preprocessor, SensorClassifier};

/// Serialized form written to `model.json`.
#[derive(Serialize, Deserialize)]
struct SensorModelBundle {
    feature_names: Vec<String>,
    preprocessor: Preprocessor,
    config: ModelConfig,
    weights: Vec<u8>,
}

/// A trained classifier that scores raw feature tables.
#[derive(Debug)]
pub struct SensorModel {
    feature_names: Vec<String>,
    preprocessor: Preprocessor,
    config: ModelConfig,
    classifier: SensorClassifier<InferenceBackend>,
}

impl SensorModel {
    #[must_use]
    pub fn new(
        feature_names: Vec<String>,
        preprocessor: Preprocessor,
        config: ModelConfig,
        classifier: SensorClassifier<InferenceBackend>,
    ) -> Self {
        Self {
            feature_names,
            preprocessor,
            config,
            classifier,
        }
    }

    /// Feature columns the model reads, in order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub const fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Classifies rows that have already been preprocessed.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature width differs from the model's.
    pub fn predict_transformed(&self, features: &NumericArray) -> Result<Vec<u8>, ModelError> {
        if features.cols() != self.config.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.config.n_features,
                actual: features.cols(),
            });
        }
        if features.rows() == 0 {
            return Ok(Vec::new());
        }

        let input = features_tensor::<InferenceBackend>(features, &Default::default());
        Ok(self.classifier.classify(input))
    }

    /// Classifies raw, cleaned feature rows.
    ///
    /// Columns are picked by name; extra columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a feature column is missing or not numeric.
    pub fn predict(&self, features: &Table) -> Result<Vec<u8>, ModelError> {
        let selected = features.select(&self.feature_names)?;
        let array = NumericArray::from_table(&selected)?;
        let transformed = self.preprocessor.transform(&array)?;
        self.predict_transformed(&transformed)
    }

    /// Encodes the model as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if recording the weights fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let weights = BinBytesRecorder::<FullPrecisionSettings>::default()
            .record(self.classifier.clone().into_record(), ())
            .map_err(|e| ModelError::Record(format!("{e:?}")))?;

        let bundle = SensorModelBundle {
            feature_names: self.feature_names.clone(),
            preprocessor: self.preprocessor.clone(),
            config: self.config.clone(),
            weights,
        };
        Ok(serde_json::to_vec(&bundle)?)
    }

    /// Decodes a model written by [`SensorModel::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle or its weights are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let bundle: SensorModelBundle = serde_json::from_slice(bytes)?;
        let device = Default::default();

        let record = BinBytesRecorder::<FullPrecisionSettings>::default()
            .load(bundle.weights, &device)
            .map_err(|e| ModelError::Record(format!("{e:?}")))?;
        let classifier = bundle
            .config
            .init::<InferenceBackend>(&device)
            .load_record(record);

        Ok(Self::new(
            bundle.feature_names,
            bundle.preprocessor,
            bundle.config,
            classifier,
        ))
    }
}
