use super::types::{LabeledDataset, LoadReport};
use super::validator::DataValidator;
use crate::data::encoder::LabelEncoder;
use crate::error::{IdsightError, Result};
use crate::types::FeatureMatrix;
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| IdsightError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load a labelled traffic capture and turn it into a numeric dataset.
    ///
    /// Every column except `label_column` and `excluded_columns` becomes a
    /// feature. Values that cannot be read as finite numbers mark the row as
    /// missing and the row is dropped.
    pub fn load_dataset<P: AsRef<Path>>(
        path: P,
        label_column: &str,
        excluded_columns: &[String],
    ) -> Result<(LabeledDataset, LoadReport)> {
        let df = Self::load(&path)?;
        log::info!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.as_ref().display()
        );
        Self::from_dataframe(&df, label_column, excluded_columns)
    }

    pub fn from_dataframe(
        df: &DataFrame,
        label_column: &str,
        excluded_columns: &[String],
    ) -> Result<(LabeledDataset, LoadReport)> {
        let column_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if !column_names.iter().any(|c| c == label_column) {
            return Err(IdsightError::DataLoading(format!(
                "Missing label column: {}",
                label_column
            )));
        }

        let feature_names: Vec<String> = column_names
            .into_iter()
            .filter(|c| c != label_column && !excluded_columns.contains(c))
            .collect();

        if feature_names.is_empty() {
            return Err(IdsightError::DataLoading(
                "No feature columns left after excluding label and ignored columns".to_string(),
            ));
        }

        let labels_col = df.column(label_column)?.cast(&DataType::String)?;
        let raw_labels: Vec<Option<String>> = labels_col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
            .collect();

        let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let series = df.column(name)?.cast(&DataType::Float64)?;
            let values = series
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            columns.push(values);
        }

        let mut rows = Vec::with_capacity(df.height());
        let mut labels = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let Some(label) = raw_labels[i].as_ref() else {
                continue;
            };
            let row: Option<Vec<f64>> = columns.iter().map(|c| c[i]).collect();
            if let Some(row) = row {
                rows.push(row);
                labels.push(label.clone());
            }
        }

        let report = LoadReport {
            rows_read: df.height(),
            rows_dropped: df.height() - rows.len(),
        };
        if report.rows_dropped > 0 {
            log::warn!(
                "Dropped {} of {} rows with missing or non-numeric values",
                report.rows_dropped,
                report.rows_read
            );
        }

        if rows.is_empty() {
            return Err(IdsightError::DataLoading(
                "No complete rows left after cleaning".to_string(),
            ));
        }

        let features = FeatureMatrix::from_rows(feature_names, rows)?;
        let (encoder, labels) = LabelEncoder::fit_transform(&labels)?;
        let dataset = LabeledDataset {
            features,
            labels,
            encoder,
        };
        DataValidator::validate_alignment(&dataset)?;

        for (class, count) in DataValidator::sparse_classes(&dataset) {
            log::warn!("Class '{}' has only {} sample(s)", class, count);
        }

        Ok((dataset, report))
    }
}
