use crate::error::{IdsightError, Result};
use serde::{Deserialize, Serialize};

/// Square count matrix: rows are true classes, columns predicted classes.
/// Every class of the label mapping has a row and a column, even when no
/// sample of that class appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn build(labels: &[String], y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(IdsightError::Validation(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        let k = labels.len();
        let mut counts = vec![vec![0; k]; k];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t >= k || p >= k {
                return Err(IdsightError::Validation(format!(
                    "Class code outside the {} known classes",
                    k
                )));
            }
            counts[t][p] += 1;
        }
        Ok(Self {
            labels: labels.to_vec(),
            counts,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    pub fn get(&self, true_label: &str, predicted_label: &str) -> Option<usize> {
        let t = self.labels.iter().position(|l| l == true_label)?;
        let p = self.labels.iter().position(|l| l == predicted_label)?;
        Some(self.counts[t][p])
    }

    /// Number of samples of each true class.
    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Number of predictions of each class.
    pub fn column_sums(&self) -> Vec<usize> {
        (0..self.labels.len())
            .map(|p| self.counts.iter().map(|row| row[p]).sum())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.row_sums().iter().sum()
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.counts[class][class]
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|l| l.len())
            .chain(self.counts.iter().flatten().map(|c| c.to_string().len()))
            .max()
            .unwrap_or(1);

        write!(f, "{:>width$}", "true\\pred", width = width.max(9))?;
        for label in &self.labels {
            write!(f, " {:>width$}", label, width = width)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(&self.counts) {
            write!(f, "{:>width$}", label, width = width.max(9))?;
            for count in row {
                write!(f, " {:>width$}", count, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
