//! Two-sample Kolmogorov-Smirnov test.

/// Result of [`ks_2samp`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsTest {
    /// Largest distance between the two empirical CDFs.
    pub statistic: f64,
    pub p_value: f64,
}

/// Tests whether two samples come from the same distribution.
///
/// The p-value uses the asymptotic Kolmogorov distribution with Stephens'
/// small-sample correction. Swapping the samples gives the same result.
/// Returns `None` if either sample is empty.
#[must_use]
pub fn ks_2samp(a: &[f64], b: &[f64]) -> Option<KsTest> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let statistic = ks_statistic(&a, &b);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let en = (n * m / (n + m)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * statistic);

    Some(KsTest { statistic, p_value })
}

/// Sup-norm distance between the empirical CDFs of two sorted samples.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        // step past every value equal to x on both sides before comparing
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }

    d
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_q(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;

    for k in 1..=100 {
        let k = f64::from(k);
        let term = sign * (a2 * k * k).exp();
        sum += term;
        if term.abs() <= 0.001 * previous || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        previous = term.abs();
    }

    // the series only fails to converge for tiny lambda
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples_are_indistinguishable() {
        let a: Vec<f64> = (0..50).map(f64::from).collect();
        let result = ks_2samp(&a, &a).expect("non-empty");
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_samples_drift() {
        let a: Vec<f64> = (0..100).map(f64::from).collect();
        let b: Vec<f64> = (1000..1100).map(f64::from).collect();
        let result = ks_2samp(&a, &b).expect("non-empty");
        assert!((result.statistic - 1.0).abs() < 1e-12);
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn test_statistic_with_ties() {
        // CDFs after 1: 2/3 vs 1/2; after 2: 1 vs 1/2; after 3: 1 vs 1
        let result = ks_2samp(&[1.0, 1.0, 2.0], &[1.0, 3.0]).expect("non-empty");
        assert!((result.statistic - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_under_swap() {
        let a = [0.1, 0.4, 0.35, 0.8, 0.9, 1.2, 1.5];
        let b = [0.3, 0.5, 0.55, 0.6, 1.1];
        assert_eq!(ks_2samp(&a, &b), ks_2samp(&b, &a));
    }

    #[test]
    fn test_empty_sample_has_no_result() {
        assert!(ks_2samp(&[], &[1.0]).is_none());
        assert!(ks_2samp(&[1.0], &[]).is_none());
    }
}
