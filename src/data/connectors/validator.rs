use super::types::LabeledDataset;
use crate::error::{IdsightError, Result};

pub struct DataValidator;

impl DataValidator {
    /// Check for minimum required rows
    pub fn validate_minimum_rows(dataset: &LabeledDataset, min_rows: usize) -> Result<()> {
        let rows = dataset.features.n_rows();
        if rows < min_rows {
            return Err(IdsightError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                rows, min_rows
            )));
        }
        Ok(())
    }

    /// Features and labels must be row-aligned and cover at least two classes.
    pub fn validate_alignment(dataset: &LabeledDataset) -> Result<()> {
        if dataset.features.n_rows() != dataset.labels.len() {
            return Err(IdsightError::Validation(format!(
                "{} feature rows but {} labels",
                dataset.features.n_rows(),
                dataset.labels.len()
            )));
        }
        if dataset.labels.n_classes() != dataset.encoder.n_classes() {
            return Err(IdsightError::Validation(
                "Label vector and encoder disagree on class count".to_string(),
            ));
        }
        if dataset.labels.distinct_classes() < 2 {
            return Err(IdsightError::Validation(
                "Dataset must contain at least two classes".to_string(),
            ));
        }
        Ok(())
    }

    /// Classes with fewer than two samples cannot be stratified.
    pub fn sparse_classes(dataset: &LabeledDataset) -> Vec<(String, usize)> {
        dataset
            .summary()
            .class_counts
            .into_iter()
            .filter(|(_, count)| *count < 2)
            .collect()
    }
}
