use sensor_structs::ClassificationMetricArtifact;

/// F1, precision and recall for the positive class (label 1).
///
/// A ratio with a zero denominator scores 0.
#[must_use]
pub fn classification_score(y_true: &[u8], y_pred: &[u8]) -> ClassificationMetricArtifact {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        match (truth == 1, pred == 1) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    ClassificationMetricArtifact {
        f1_score: ratio(2 * tp, 2 * tp + fp + fn_),
        precision_score: ratio(tp, tp + fp),
        recall_score: ratio(tp, tp + fn_),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
