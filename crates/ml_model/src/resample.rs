//! SMOTE oversampling followed by Tomek-link cleaning.

use dataset::NumericArray;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::ModelError;

const K_NEIGHBORS: usize = 5;

/// Balances a binary dataset.
///
/// The minority class is oversampled up to the majority count by
/// interpolating between a minority sample and one of its `k` nearest
/// minority neighbours. Afterwards every Tomek link (a pair of mutual nearest
/// neighbours with different labels) loses its member from the original
/// majority class.
#[derive(Debug, Clone, Default)]
pub struct SmoteTomek {
    seed: Option<u64>,
}

impl SmoteTomek {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the resampled features and labels.
    ///
    /// Input with a single class is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if there is not one label per row.
    pub fn fit_resample(
        &self,
        features: &NumericArray,
        labels: &[u8],
    ) -> Result<(NumericArray, Vec<u8>), ModelError> {
        if features.rows() != labels.len() {
            return Err(ModelError::TargetCount {
                expected: features.rows(),
                actual: labels.len(),
            });
        }

        let positives = labels.iter().filter(|&&l| l == 1).count();
        let negatives = labels.len() - positives;
        if positives == 0 || negatives == 0 {
            debug!(positives, negatives, "Single class present, skipping resampling");
            return Ok((features.clone(), labels.to_vec()));
        }

        let (minority, majority) = if positives < negatives { (1, 0) } else { (0, 1) };

        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let (oversampled, oversampled_labels) =
            self.oversample(features, labels, minority, &mut rng)?;
        let keep = tomek_keep_mask(&oversampled, &oversampled_labels, majority);

        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();

        let data = rows
            .iter()
            .flat_map(|&i| oversampled.row(i).iter().copied())
            .collect();
        let resampled = NumericArray::new(rows.len(), oversampled.cols(), data)?;
        let resampled_labels = rows.iter().map(|&i| oversampled_labels[i]).collect();

        debug!(
            before = labels.len(),
            after = rows.len(),
            removed = oversampled.rows() - rows.len(),
            "Resampled with SMOTE-Tomek"
        );
        Ok((resampled, resampled_labels))
    }

    fn oversample(
        &self,
        features: &NumericArray,
        labels: &[u8],
        minority: u8,
        rng: &mut SmallRng,
    ) -> Result<(NumericArray, Vec<u8>), ModelError> {
        let minority_rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == minority).collect();
        let n_new = (labels.len() - minority_rows.len()).saturating_sub(minority_rows.len());
        let k = K_NEIGHBORS.min(minority_rows.len().saturating_sub(1));

        if n_new == 0 || k == 0 {
            return Ok((features.clone(), labels.to_vec()));
        }

        let minority_points: Vec<&[f32]> = minority_rows.iter().map(|&i| features.row(i)).collect();
        let mut search = NeighborSearch::new(&minority_points);
        let neighbors: Vec<Vec<usize>> = (0..minority_points.len())
            .map(|i| search.k_nearest(i, k))
            .collect();

        let mut data = features.data().to_vec();
        data.reserve(n_new * features.cols());
        let mut out_labels = labels.to_vec();

        for _ in 0..n_new {
            let i = rng.random_range(0..minority_points.len());
            let nn = neighbors[i][rng.random_range(0..k)];
            let gap: f32 = rng.random();

            let base = minority_points[i];
            let other = minority_points[nn];
            data.extend(base.iter().zip(other).map(|(&a, &b)| gap.mul_add(b - a, a)));
            out_labels.push(minority);
        }

        let array = NumericArray::new(labels.len() + n_new, features.cols(), data)?;
        Ok((array, out_labels))
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn by_distance(a: &(f32, usize), b: &(f32, usize)) -> std::cmp::Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Neighbour queries over a fixed set of points, ties broken by index.
struct NeighborSearch<'a> {
    points: &'a [&'a [f32]],
    distances: Vec<(f32, usize)>,
}

impl<'a> NeighborSearch<'a> {
    fn new(points: &'a [&'a [f32]]) -> Self {
        Self {
            points,
            distances: Vec::with_capacity(points.len()),
        }
    }

    /// Closest point to `points[target]`, excluding itself.
    fn nearest(&self, target: usize) -> Option<usize> {
        let origin = self.points[target];
        self.points
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != target)
            .map(|(i, p)| (squared_distance(origin, p), i))
            .min_by(by_distance)
            .map(|(_, i)| i)
    }

    /// Indices of the `k` points closest to `points[target]`, excluding
    /// itself, nearest first.
    fn k_nearest(&mut self, target: usize, k: usize) -> Vec<usize> {
        if k == 1 {
            return self.nearest(target).into_iter().collect();
        }

        let origin = self.points[target];
        self.distances.clear();
        self.distances.extend(
            self.points
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != target)
                .map(|(i, p)| (squared_distance(origin, p), i)),
        );

        let k = k.min(self.distances.len());
        if k == 0 {
            return Vec::new();
        }
        if k < self.distances.len() {
            self.distances.select_nth_unstable_by(k - 1, by_distance);
        }

        let closest = &mut self.distances[..k];
        closest.sort_unstable_by(by_distance);
        closest.iter().map(|&(_, i)| i).collect()
    }
}

/// `false` for every row that is the `majority` member of a Tomek link.
fn tomek_keep_mask(features: &NumericArray, labels: &[u8], majority: u8) -> Vec<bool> {
    let points: Vec<&[f32]> = (0..features.rows()).map(|i| features.row(i)).collect();
    let search = NeighborSearch::new(&points);
    let nearest: Vec<Option<usize>> = (0..points.len()).map(|i| search.nearest(i)).collect();

    let mut keep = vec![true; points.len()];
    for (i, nn) in nearest.iter().enumerate() {
        let Some(j) = *nn else { continue };
        let is_link = labels[i] != labels[j] && nearest[j] == Some(i);
        if is_link && labels[i] == majority {
            keep[i] = false;
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (NumericArray, Vec<u8>) {
        // 8 negatives around 0, 3 positives around 10
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..8 {
            rows.push(vec![i as f32 * 0.1, 0.0]);
            labels.push(0);
        }
        for i in 0..3 {
            rows.push(vec![10.0 + i as f32 * 0.1, 1.0]);
            labels.push(1);
        }
        (NumericArray::from_rows(2, &rows).expect("array"), labels)
    }

    #[test]
    fn test_balances_classes() {
        let (features, labels) = imbalanced();
        let (resampled, resampled_labels) = SmoteTomek::new()
            .with_seed(Some(7))
            .fit_resample(&features, &labels)
            .expect("resample");

        let positives = resampled_labels.iter().filter(|&&l| l == 1).count();
        assert_eq!(positives, 8);
        assert_eq!(resampled_labels.len() - positives, 8);
        assert_eq!(resampled.rows(), 16);

        // synthetic positives lie on segments between real positives
        for i in 11..16 {
            let row = resampled.row(i);
            assert!((10.0..=10.2).contains(&row[0]));
            assert!((row[1] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_seed_is_deterministic() {
        let (features, labels) = imbalanced();
        let resampler = SmoteTomek::new().with_seed(Some(3));
        let a = resampler.fit_resample(&features, &labels).expect("a");
        let b = resampler.fit_resample(&features, &labels).expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn test_tomek_removes_majority_member_only() {
        // rows 1 and 2 are mutual nearest neighbours with different labels
        let features =
            NumericArray::from_rows(1, &[vec![0.0], vec![5.0], vec![5.1], vec![10.0]]).expect("array");
        let labels = [0, 0, 1, 1];

        let keep = tomek_keep_mask(&features, &labels, 0);
        assert_eq!(keep, vec![true, false, true, true]);
    }

    #[test]
    fn test_neighbor_search_matches_full_sort() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut rows: Vec<Vec<f32>> = (0..60)
            .map(|_| (0..4).map(|_| rng.random_range(-5.0..5.0)).collect())
            .collect();
        // duplicated point forces a distance tie
        rows.push(rows[3].clone());
        let points: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();

        let mut search = NeighborSearch::new(&points);
        for target in [0, 3, 29, 60] {
            let mut expected: Vec<(f32, usize)> = points
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != target)
                .map(|(i, p)| (squared_distance(points[target], p), i))
                .collect();
            expected.sort_by(by_distance);

            for k in [1, 2, 5, 60, 100] {
                let want: Vec<usize> = expected.iter().take(k).map(|&(_, i)| i).collect();
                assert_eq!(search.k_nearest(target, k), want, "target {target}, k {k}");
            }
            assert_eq!(search.nearest(target), Some(expected[0].1));
        }
    }

    #[test]
    fn test_resamples_thousands_of_rows() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..3000 {
            let positive = i % 20 == 0;
            let offset = if positive { 4.0 } else { 0.0 };
            rows.push((0..8).map(|_| offset + rng.random_range(0.0..1.0)).collect::<Vec<f32>>());
            labels.push(u8::from(positive));
        }
        let features = NumericArray::from_rows(8, &rows).expect("array");

        let (resampled, resampled_labels) = SmoteTomek::new()
            .with_seed(Some(1))
            .fit_resample(&features, &labels)
            .expect("resample");

        let positives = resampled_labels.iter().filter(|&&l| l == 1).count();
        assert_eq!(positives, 2850);
        assert_eq!(resampled.rows(), resampled_labels.len());
        assert!(resampled.rows() <= 5700);
    }

    #[test]
    fn test_single_class_is_unchanged() {
        let features = NumericArray::from_rows(1, &[vec![0.0], vec![1.0]]).expect("array");
        let (out, labels) = SmoteTomek::new()
            .fit_resample(&features, &[0, 0])
            .expect("resample");
        assert_eq!(out, features);
        assert_eq!(labels, vec![0, 0]);
    }
}
