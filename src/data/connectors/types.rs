use crate::data::encoder::LabelEncoder;
use crate::types::{FeatureMatrix, LabelVector};
use serde::{Deserialize, Serialize};

/// Fully numeric dataset ready for feature selection.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub features: FeatureMatrix,
    pub labels: LabelVector,
    pub encoder: LabelEncoder,
}

impl LabeledDataset {
    pub fn summary(&self) -> DatasetSummary {
        let counts = self.labels.class_counts();
        DatasetSummary {
            num_rows: self.features.n_rows(),
            num_features: self.features.n_features(),
            class_counts: self
                .encoder
                .class_names()
                .iter()
                .cloned()
                .zip(counts)
                .collect(),
        }
    }
}

/// Row/column counts and the class distribution of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub num_rows: usize,
    pub num_features: usize,
    pub class_counts: Vec<(String, usize)>,
}

impl DatasetSummary {
    /// Ratio between the largest and smallest non-empty class.
    pub fn imbalance_ratio(&self) -> f64 {
        let present = self.class_counts.iter().map(|(_, c)| *c).filter(|&c| c > 0);
        let max = present.clone().max().unwrap_or(0);
        let min = present.min().unwrap_or(0);
        if min == 0 {
            0.0
        } else {
            max as f64 / min as f64
        }
    }
}

/// Report of rows removed while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
}
