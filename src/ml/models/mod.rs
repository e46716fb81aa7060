pub mod forest;
pub mod tree;

pub use forest::{ForestParams, MaxFeatures, RandomForest};
pub use tree::{DecisionTree, Split, TreeNode, TreeParams};

use crate::types::FeatureMatrix;

/// Prediction surface shared by every model the pipeline trains.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Class probabilities for one row; its width must equal `n_features()`.
    fn predict_proba(&self, row: &[f64]) -> Vec<f64>;

    fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Vec<usize> {
        x.rows().map(|row| self.predict(row)).collect()
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Index of the largest value other than `exclude`, if there is one.
pub fn runner_up(values: &[f64], exclude: usize) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != exclude)
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
