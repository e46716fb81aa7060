use super::classification::{ClassScores, ClassificationMetrics};
use super::confusion::ConfusionMatrix;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Aggregate scores of one training run. Precision, recall and F1 are macro
/// averages throughout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub per_class: Vec<ClassScores>,
    pub confusion_matrix: ConfusionMatrix,
}

pub struct MetricsEngine {
    class_names: Vec<String>,
}

impl MetricsEngine {
    pub fn new(class_names: &[String]) -> Self {
        Self {
            class_names: class_names.to_vec(),
        }
    }

    pub fn calculate_all(&self, y_true: &[usize], y_pred: &[usize]) -> Result<EvaluationMetrics> {
        let confusion_matrix = ConfusionMatrix::build(&self.class_names, y_true, y_pred)?;
        let per_class = ClassificationMetrics::per_class(&confusion_matrix);
        let accuracy = ClassificationMetrics::accuracy(&confusion_matrix);
        let (precision, recall, f1_score) =
            ClassificationMetrics::macro_average(&per_class, &confusion_matrix);

        Ok(EvaluationMetrics {
            accuracy,
            precision,
            recall,
            f1_score,
            per_class,
            confusion_matrix,
        })
    }
}
