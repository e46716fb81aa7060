use serde::{Deserialize, Serialize};

/// Row indices of one train/holdout partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSplit {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Configuration for data splitting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    pub holdout_fraction: f64, // e.g., 0.2 = 20% held out
    pub seed: u64,
}

