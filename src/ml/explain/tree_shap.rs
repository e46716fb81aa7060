//! Exact path-dependent TreeSHAP for [`RandomForest`].
//!
//! Follows Algorithm 2 of Lundberg et al., "Consistent Individualized Feature
//! Attribution for Tree Ensembles". Every tree leaf holds a class
//! distribution, so attributions are produced for all classes in one pass.
//! For each class `k`, `expected[k] + sum(values[f][k]) == predict_proba[k]`.

use crate::ml::models::{Classifier, DecisionTree, RandomForest};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Per-class SHAP output for one row: `values[feature][class]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapValues {
    pub values: Vec<Vec<f64>>,
    pub expected: Vec<f64>,
}

impl ShapValues {
    pub fn for_class(&self, class: usize) -> Vec<f64> {
        self.values.iter().map(|per_class| per_class[class]).collect()
    }
}

pub struct TreeShapExplainer<'a> {
    forest: &'a RandomForest,
    expected: Vec<f64>,
}

impl<'a> TreeShapExplainer<'a> {
    pub fn new(forest: &'a RandomForest) -> Self {
        Self {
            forest,
            expected: forest.expected_value(),
        }
    }

    pub fn expected_value(&self) -> &[f64] {
        &self.expected
    }

    pub fn shap_values(&self, row: &[f64]) -> ShapValues {
        let n_classes = self.forest.n_classes();
        let mut values = vec![vec![0.0; n_classes]; self.forest.n_features()];

        for tree in self.forest.trees() {
            recurse(tree, row, 0, Vec::new(), 1.0, 1.0, None, &mut values);
        }

        let count = self.forest.trees().len() as f64;
        for per_class in values.iter_mut() {
            per_class.iter_mut().for_each(|v| *v /= count);
        }

        ShapValues {
            values,
            expected: self.expected.clone(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &DecisionTree,
    row: &[f64],
    node_id: usize,
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
    phi: &mut [Vec<f64>],
) {
    extend(&mut path, zero_fraction, one_fraction, feature);
    let node = &tree.nodes()[node_id];

    let Some(split) = node.split else {
        for i in 1..path.len() {
            let weight = unwound_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                let scale = weight * (el.one_fraction - el.zero_fraction);
                for (acc, leaf) in phi[f].iter_mut().zip(&node.distribution) {
                    *acc += scale * leaf;
                }
            }
        }
        return;
    };

    let (hot, cold) = if row[split.feature] <= split.threshold {
        (split.left, split.right)
    } else {
        (split.right, split.left)
    };
    let nodes = tree.nodes();
    let hot_zero = nodes[hot].cover / node.cover;
    let cold_zero = nodes[cold].cover / node.cover;

    // A feature already on the path is undone first so it appears once.
    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(k) = path.iter().position(|p| p.feature == Some(split.feature)) {
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind(&mut path, k);
    }

    recurse(
        tree,
        row,
        hot,
        path.clone(),
        hot_zero * incoming_zero,
        incoming_one,
        Some(split.feature),
        phi,
    );
    recurse(
        tree,
        row,
        cold,
        path,
        cold_zero * incoming_zero,
        0.0,
        Some(split.feature),
        phi,
    );
}

fn extend(path: &mut Vec<PathElement>, zero: f64, one: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction: zero,
        one_fraction: one,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one * path[i].pweight * (i as f64 + 1.0) / (d + 1.0);
        path[i].pweight = zero * path[i].pweight * (d - i as f64) / (d + 1.0);
    }
}

fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one * (d + 1.0) / ((i as f64 + 1.0) * one);
            next_one = tmp - path[i].pweight * zero * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero * (d - i as f64));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one * (d + 1.0) / ((i as f64 + 1.0) * one);
            total += tmp;
            next_one = path[i].pweight - tmp * zero * ((d - i as f64) / (d + 1.0));
        } else if zero != 0.0 {
            total += (path[i].pweight / zero) / ((d - i as f64) / (d + 1.0));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::ForestParams;
    use crate::types::{FeatureMatrix, LabelVector};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn dataset(n: usize, seed: u64) -> (FeatureMatrix, LabelVector) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = Vec::new();
        let mut codes = Vec::new();
        for _ in 0..n {
            let a: f64 = rng.gen_range(-3.0..3.0);
            let b: f64 = rng.gen_range(-3.0..3.0);
            let c: f64 = rng.gen_range(-3.0..3.0);
            let class = if a + 0.5 * b > 1.0 {
                2
            } else if a - c > 0.0 {
                1
            } else {
                0
            };
            rows.push(vec![a, b, c]);
            codes.push(class);
        }
        let x = FeatureMatrix::from_rows(vec!["a".into(), "b".into(), "c".into()], rows).unwrap();
        (x, LabelVector::new(codes, 3).unwrap())
    }

    #[test]
    fn test_additive_identity_holds_for_every_class() {
        let (x, y) = dataset(120, 21);
        let params = ForestParams {
            n_trees: 12,
            max_depth: Some(6),
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, &params).unwrap();
        let explainer = TreeShapExplainer::new(&forest);

        for i in 0..20 {
            let row = x.row(i);
            let shap = explainer.shap_values(row);
            let proba = forest.predict_proba(row);
            for class in 0..3 {
                let total: f64 = shap.for_class(class).iter().sum();
                let reconstructed = shap.expected[class] + total;
                assert!(
                    (reconstructed - proba[class]).abs() < 1e-9,
                    "row {} class {}: {} vs {}",
                    i,
                    class,
                    reconstructed,
                    proba[class]
                );
            }
        }
    }

    #[test]
    fn test_single_stump_matches_closed_form() {
        // One split on feature 0: left leaf all class 0 (cover 3), right leaf
        // all class 1 (cover 1). A left-going sample gets
        // phi_0 = f(x) - E[f] for the split feature and zero elsewhere.
        let x = FeatureMatrix::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![0.0, 5.0], vec![0.0, 5.0], vec![0.0, 5.0], vec![1.0, 5.0]],
        )
        .unwrap();
        let y = LabelVector::new(vec![0, 0, 0, 1], 2).unwrap();
        let params = ForestParams {
            n_trees: 1,
            bootstrap: false,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, &params).unwrap();
        let explainer = TreeShapExplainer::new(&forest);
        let shap = explainer.shap_values(&[0.0, 5.0]);

        assert!((shap.expected[1] - 0.25).abs() < 1e-12);
        assert!((shap.values[0][1] + 0.25).abs() < 1e-12);
        assert_eq!(shap.values[1][1], 0.0);
    }

    #[test]
    fn test_unused_feature_gets_zero() {
        let (x, y) = dataset(60, 4);
        let mut rows: Vec<Vec<f64>> = x.rows().map(|r| r.to_vec()).collect();
        for row in rows.iter_mut() {
            row.push(9.0);
        }
        let names = vec!["a".into(), "b".into(), "c".into(), "flat".into()];
        let x = FeatureMatrix::from_rows(names, rows).unwrap();
        let forest = RandomForest::fit(&x, &y, &ForestParams { n_trees: 6, ..ForestParams::default() }).unwrap();
        let shap = TreeShapExplainer::new(&forest).shap_values(x.row(3));
        assert!(shap.values[3].iter().all(|v| *v == 0.0));
    }
}
