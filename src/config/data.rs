use super::traits::ConfigSection;
use crate::error::IdsightError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub label_column: String,
    pub excluded_columns: Vec<String>,
    pub min_rows: usize,
    /// Largest/smallest class ratio above which loading warns.
    pub max_imbalance_ratio: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            label_column: "Label".to_string(),
            excluded_columns: vec!["Timestamp".to_string()],
            min_rows: 10,
            max_imbalance_ratio: 10.0,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), IdsightError> {
        if self.label_column.trim().is_empty() {
            return Err(IdsightError::Configuration(
                "Label column name must not be empty".to_string(),
            ));
        }
        if self.excluded_columns.contains(&self.label_column) {
            return Err(IdsightError::Configuration(
                "Label column cannot also be excluded".to_string(),
            ));
        }
        if self.max_imbalance_ratio.is_nan() || self.max_imbalance_ratio < 1.0 {
            return Err(IdsightError::Configuration(
                "max_imbalance_ratio must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
