use super::{argmax, Classifier};
use crate::error::{IdsightError, Result};
use crate::types::{FeatureMatrix, LabelVector};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Internal split: rows with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
    /// Weighted Gini decrease achieved by this split.
    pub gain: f64,
}

/// A tree node keeps the training cover and class distribution that reached
/// it. Leaves have no split. Covers are what TreeSHAP needs to weigh the
/// branches a sample does not take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub cover: f64,
    pub distribution: Vec<f64>,
    pub split: Option<Split>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per node; `None` means all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// CART classification tree grown with Gini impurity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `sample` (repeats allowed, which is
    /// how bootstrap samples are passed in).
    pub fn fit<R: Rng>(
        x: &FeatureMatrix,
        y: &LabelVector,
        sample: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Result<Self> {
        if sample.is_empty() {
            return Err(IdsightError::Validation(
                "Cannot grow a tree on an empty sample".to_string(),
            ));
        }
        if x.n_rows() != y.len() {
            return Err(IdsightError::Validation(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            n_features: x.n_features(),
            n_classes: y.n_classes(),
        };
        let mut builder = Builder {
            x,
            y,
            params,
            rng,
        };
        builder.grow(&mut tree.nodes, sample.to_vec(), 0);
        Ok(tree)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], id: usize) -> usize {
            match nodes[id].split {
                Some(s) => 1 + walk(nodes, s.left).max(walk(nodes, s.right)),
                None => 1,
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn leaf_for(&self, row: &[f64]) -> &TreeNode {
        let mut node = &self.nodes[0];
        while let Some(split) = node.split {
            node = if row[split.feature] <= split.threshold {
                &self.nodes[split.left]
            } else {
                &self.nodes[split.right]
            };
        }
        node
    }

    /// Check a tree that did not come from [`DecisionTree::fit`], such as one
    /// read back from disk. Children always sit after their parent, which
    /// rules out cycles as well as dangling indices.
    pub fn check_structure(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(IdsightError::Validation("tree has no nodes".to_string()));
        }
        if self.n_features != n_features || self.n_classes != n_classes {
            return Err(IdsightError::Validation(format!(
                "tree is shaped for {} features and {} classes, expected {} and {}",
                self.n_features, self.n_classes, n_features, n_classes
            )));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if node.distribution.len() != n_classes {
                return Err(IdsightError::Validation(format!(
                    "node {} has {} class probabilities for {} classes",
                    id,
                    node.distribution.len(),
                    n_classes
                )));
            }
            let Some(split) = node.split else {
                continue;
            };
            if split.feature >= n_features {
                return Err(IdsightError::Validation(format!(
                    "node {} splits on feature {} of {}",
                    id, split.feature, n_features
                )));
            }
            for child in [split.left, split.right] {
                if child <= id || child >= self.nodes.len() {
                    return Err(IdsightError::Validation(format!(
                        "node {} points at child {} outside {}..{}",
                        id,
                        child,
                        id + 1,
                        self.nodes.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Gain per feature, normalised to sum to one (all zeros for a stump).
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for split in self.nodes.iter().filter_map(|n| n.split) {
            importances[split.feature] += split.gain;
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        importances
    }
}

impl Classifier for DecisionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        self.leaf_for(row).distribution.clone()
    }

    fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.leaf_for(row).distribution)
    }
}

struct Builder<'a, R> {
    x: &'a FeatureMatrix,
    y: &'a LabelVector,
    params: &'a TreeParams,
    rng: &'a mut R,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    weighted_impurity: f64,
}

impl<R: Rng> Builder<'_, R> {
    fn grow(&mut self, nodes: &mut Vec<TreeNode>, indices: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&indices);
        let n = indices.len() as f64;
        let id = nodes.len();
        nodes.push(TreeNode {
            cover: n,
            distribution: counts.iter().map(|&c| c / n).collect(),
            split: None,
        });

        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || indices.len() < self.params.min_samples_split.max(2) {
            return id;
        }

        let Some(best) = self.best_split(&indices) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x.get(i, best.feature) <= best.threshold);

        let parent_impurity = n - counts.iter().map(|c| c * c).sum::<f64>() / n;
        let left_id = self.grow(nodes, left, depth + 1);
        let right_id = self.grow(nodes, right, depth + 1);
        nodes[id].split = Some(Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_id,
            right: right_id,
            gain: (parent_impurity - best.weighted_impurity).max(0.0),
        });
        id
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.y.n_classes()];
        for &i in indices {
            counts[self.y.get(i)] += 1.0;
        }
        counts
    }

    /// Examine `max_features` random features; keep drawing past that budget
    /// only while no usable split has been found.
    fn best_split(&mut self, indices: &[usize]) -> Option<Candidate> {
        let mut features: Vec<usize> = (0..self.x.n_features()).collect();
        features.shuffle(&mut *self.rng);
        let budget = self
            .params
            .max_features
            .unwrap_or(features.len())
            .clamp(1, features.len());

        let mut best: Option<Candidate> = None;
        for (k, &feature) in features.iter().enumerate() {
            if k >= budget && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_threshold(indices, feature) {
                let better = best
                    .as_ref()
                    .map_or(true, |b| candidate.weighted_impurity < b.weighted_impurity);
                if better {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_threshold(&self, indices: &[usize], feature: usize) -> Option<Candidate> {
        let mut pairs: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.x.get(i, feature), self.y.get(i)))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n_classes = self.y.n_classes();
        let mut left = vec![0.0; n_classes];
        let mut right = vec![0.0; n_classes];
        for &(_, c) in &pairs {
            right[c] += 1.0;
        }

        let mut best: Option<Candidate> = None;
        for i in 1..n {
            let (prev_value, prev_class) = pairs[i - 1];
            left[prev_class] += 1.0;
            right[prev_class] -= 1.0;

            let value = pairs[i].0;
            if prev_value >= value || i < min_leaf || n - i < min_leaf {
                continue;
            }

            let nl = i as f64;
            let nr = (n - i) as f64;
            let weighted = (nl - left.iter().map(|c| c * c).sum::<f64>() / nl)
                + (nr - right.iter().map(|c| c * c).sum::<f64>() / nr);

            if best.as_ref().map_or(true, |b| weighted < b.weighted_impurity) {
                let mut threshold = prev_value + (value - prev_value) / 2.0;
                if threshold >= value {
                    threshold = prev_value;
                }
                best = Some(Candidate {
                    feature,
                    threshold,
                    weighted_impurity: weighted,
                });
            }
        }
        best
    }
}
