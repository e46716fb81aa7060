use super::confusion::ConfusionMatrix;
use serde::{Deserialize, Serialize};

/// Precision, recall and F1 of a single class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

pub struct ClassificationMetrics;

impl ClassificationMetrics {
    /// Per-class scores. A ratio with an empty denominator is 0.0.
    pub fn per_class(cm: &ConfusionMatrix) -> Vec<ClassScores> {
        let predicted = cm.column_sums();
        let actual = cm.row_sums();

        cm.labels()
            .iter()
            .enumerate()
            .map(|(k, label)| {
                let tp = cm.true_positives(k) as f64;
                let precision = ratio(tp, predicted[k] as f64);
                let recall = ratio(tp, actual[k] as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                ClassScores {
                    label: label.clone(),
                    precision,
                    recall,
                    f1,
                    support: actual[k],
                }
            })
            .collect()
    }

    pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
        let correct: usize = (0..cm.labels().len()).map(|k| cm.true_positives(k)).sum();
        ratio(correct as f64, cm.total() as f64)
    }

    /// Unweighted mean over classes that occur in the true labels or the
    /// predictions; classes absent from both carry no information.
    pub fn macro_average(scores: &[ClassScores], cm: &ConfusionMatrix) -> (f64, f64, f64) {
        let predicted = cm.column_sums();
        let present: Vec<&ClassScores> = scores
            .iter()
            .enumerate()
            .filter(|(k, s)| s.support > 0 || predicted[*k] > 0)
            .map(|(_, s)| s)
            .collect();
        if present.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let n = present.len() as f64;
        (
            present.iter().map(|s| s.precision).sum::<f64>() / n,
            present.iter().map(|s| s.recall).sum::<f64>() / n,
            present.iter().map(|s| s.f1).sum::<f64>() / n,
        )
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_class_scores() {
        let labels = vec!["Benign".to_string(), "Bot".to_string()];
        // Benign: 3 true, 2 predicted right, 1 predicted Bot
        // Bot: 2 true, both predicted Bot
        let cm = ConfusionMatrix::build(&labels, &[0, 0, 0, 1, 1], &[0, 0, 1, 1, 1]).unwrap();
        let scores = ClassificationMetrics::per_class(&cm);

        assert!((scores[0].precision - 1.0).abs() < 1e-12);
        assert!((scores[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((scores[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((scores[1].recall - 1.0).abs() < 1e-12);
        assert!((ClassificationMetrics::accuracy(&cm) - 0.8).abs() < 1e-12);

        let (p, r, f1) = ClassificationMetrics::macro_average(&scores, &cm);
        assert!((p - 5.0 / 6.0).abs() < 1e-12);
        assert!((r - 5.0 / 6.0).abs() < 1e-12);
        assert!((f1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_absent_class_excluded_from_macro() {
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let cm = ConfusionMatrix::build(&labels, &[0, 1], &[0, 1]).unwrap();
        let scores = ClassificationMetrics::per_class(&cm);
        assert_eq!(scores[2].support, 0);
        let (p, r, f1) = ClassificationMetrics::macro_average(&scores, &cm);
        assert_eq!((p, r, f1), (1.0, 1.0, 1.0));
    }
}
