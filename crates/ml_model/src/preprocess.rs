//! Constant imputation followed by median/IQR scaling.

use dataset::NumericArray;
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Value missing cells are replaced with.
pub const IMPUTE_FILL_VALUE: f32 = 0.0;

const QUANTILE_RANGE: (f64, f64) = (0.25, 0.75);

/// Fitted preprocessing: `x -> (impute(x) - median) / iqr` per column.
///
/// Statistics come from the training features only; the same fitted
/// instance transforms every other split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    fill_value: f32,
    center: Vec<f32>,
    scale: Vec<f32>,
}

impl Preprocessor {
    /// Learns per-column median and interquartile range of the imputed data.
    ///
    /// A column with zero IQR keeps a scale of 1.
    ///
    /// # Errors
    ///
    /// Returns an error if `features` has no rows.
    pub fn fit(features: &NumericArray) -> Result<Self, ModelError> {
        if features.rows() == 0 {
            return Err(ModelError::EmptyInput);
        }

        let mut center = Vec::with_capacity(features.cols());
        let mut scale = Vec::with_capacity(features.cols());

        for j in 0..features.cols() {
            let mut values: Vec<f64> = features
                .column(j)
                .into_iter()
                .map(|v| f64::from(impute(v, IMPUTE_FILL_VALUE)))
                .collect();
            values.sort_by(f64::total_cmp);

            let median = percentile(&values, 0.5);
            let iqr = percentile(&values, QUANTILE_RANGE.1) - percentile(&values, QUANTILE_RANGE.0);

            center.push(median as f32);
            scale.push(if iqr == 0.0 { 1.0 } else { iqr as f32 });
        }

        Ok(Self {
            fill_value: IMPUTE_FILL_VALUE,
            center,
            scale,
        })
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.center.len()
    }

    /// Imputes and scales `features` with the fitted statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the column count differs from the fitted one.
    pub fn transform(&self, features: &NumericArray) -> Result<NumericArray, ModelError> {
        if features.cols() != self.n_features() {
            return Err(ModelError::FeatureCount {
                expected: self.n_features(),
                actual: features.cols(),
            });
        }

        let cols = features.cols();
        let data = features
            .data()
            .iter()
            .enumerate()
            .map(|(idx, &v)| {
                let j = idx % cols;
                (impute(v, self.fill_value) - self.center[j]) / self.scale[j]
            })
            .collect();

        Ok(NumericArray::new(features.rows(), cols, data)?)
    }

    /// Fits on `features` and transforms them.
    ///
    /// # Errors
    ///
    /// See [`Preprocessor::fit`].
    pub fn fit_transform(features: &NumericArray) -> Result<(Self, NumericArray), ModelError> {
        let preprocessor = Self::fit(features)?;
        let transformed = preprocessor.transform(features)?;
        Ok((preprocessor, transformed))
    }
}

/// A [`Preprocessor`] together with the feature columns it was fitted on.
///
/// This is the transformer object persisted by the transformation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    pub feature_names: Vec<String>,
    pub preprocessor: Preprocessor,
}

fn impute(value: f32, fill_value: f32) -> f32 {
    if value.is_nan() { fill_value } else { value }
}

/// Linear-interpolated percentile of sorted, non-empty `values`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 0.5) - 2.5).abs() < 1e-12);
        assert!((percentile(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((percentile(&sorted, 0.75) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_fit_imputes_before_scaling() {
        // column 0: [1, 2, 3, NaN] imputes to [0, 1, 2, 3]
        // column 1: constant, so its scale stays 1
        let features = NumericArray::new(
            4,
            2,
            vec![1.0, 5.0, 2.0, 5.0, 3.0, 5.0, f32::NAN, 5.0],
        )
        .expect("array");

        let (preprocessor, transformed) = Preprocessor::fit_transform(&features).expect("fit");
        assert_eq!(preprocessor.center, vec![1.5, 5.0]);
        assert_eq!(preprocessor.scale, vec![1.5, 1.0]);

        assert!((transformed.row(0)[0] - (-1.0 / 3.0)).abs() < 1e-6);
        assert!((transformed.row(3)[0] - (-1.0)).abs() < 1e-6);
        assert!(transformed.column(1).iter().all(|&v| v == 0.0));
        assert!(transformed.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_reuses_fitted_statistics() {
        let train = NumericArray::new(3, 1, vec![0.0, 10.0, 20.0]).expect("array");
        let test = NumericArray::new(1, 1, vec![30.0]).expect("array");

        let preprocessor = Preprocessor::fit(&train).expect("fit");
        let scaled = preprocessor.transform(&test).expect("transform");
        assert!((scaled.row(0)[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_transform_rejects_width_mismatch() {
        let train = NumericArray::new(1, 2, vec![0.0, 1.0]).expect("array");
        let preprocessor = Preprocessor::fit(&train).expect("fit");
        let other = NumericArray::new(1, 3, vec![0.0; 3]).expect("array");
        assert!(matches!(
            preprocessor.transform(&other),
            Err(ModelError::FeatureCount { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_fit_rejects_empty() {
        let empty = NumericArray::new(0, 2, vec![]).expect("array");
        assert!(matches!(Preprocessor::fit(&empty), Err(ModelError::EmptyInput)));
    }
}
