use super::tree::{DecisionTree, TreeParams};
use super::Classifier;
use crate::error::{IdsightError, Result};
use crate::types::{FeatureMatrix, LabelVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().round() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(k) => *k,
        };
        n.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(IdsightError::Configuration(
                "Forest needs at least one tree".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(IdsightError::Configuration(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == MaxFeatures::Count(0) {
            return Err(IdsightError::Configuration(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_seed(&self, tree: usize) -> u64 {
        self.seed
            .wrapping_add((tree as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// Bagged ensemble of CART trees. The predicted probability is the mean of
/// the per-tree leaf distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    /// Fit on all rows of `x`. Each tree draws from its own seeded RNG, so the
    /// result does not depend on how rayon schedules the trees.
    pub fn fit(x: &FeatureMatrix, y: &LabelVector, params: &ForestParams) -> Result<Self> {
        params.validate()?;
        if x.n_rows() != y.len() {
            return Err(IdsightError::Validation(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if x.n_rows() == 0 {
            return Err(IdsightError::DegenerateSubset(
                "no training rows".to_string(),
            ));
        }
        if y.distinct_classes() < 2 {
            return Err(IdsightError::DegenerateSubset(
                "training labels contain a single class".to_string(),
            ));
        }
        if !x.has_varying_column() {
            return Err(IdsightError::DegenerateSubset(
                "every selected feature is constant".to_string(),
            ));
        }

        let n = x.n_rows();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(params.max_features.resolve(x.n_features())),
        };

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.tree_seed(t));
                let sample: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(x, y, &sample, &tree_params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            trees,
            n_features: x.n_features(),
            n_classes: y.n_classes(),
        })
    }

    /// Reject forests whose trees cannot be walked safely.
    pub fn check_structure(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(IdsightError::Validation("forest has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check_structure(self.n_features, self.n_classes)
                .map_err(|e| match e {
                    IdsightError::Validation(msg) => {
                        IdsightError::Validation(format!("tree {}: {}", i, msg))
                    }
                    other => other,
                })?;
        }
        Ok(())
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean over trees of the root class distribution, i.e. the model's
    /// expected output over its (bootstrapped) training data.
    pub fn expected_value(&self) -> Vec<f64> {
        let mut expected = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (e, p) in expected.iter_mut().zip(&tree.root().distribution) {
                *e += p;
            }
        }
        let count = self.trees.len() as f64;
        expected.iter_mut().for_each(|e| *e /= count);
        expected
    }

    /// Mean decrease in impurity, averaged over trees.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let count = self.trees.len() as f64;
        importances.iter_mut().for_each(|v| *v /= count);
        importances
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(&tree.leaf_for(row).distribution) {
                *acc += p;
            }
        }
        let count = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= count);
        proba
    }
}
