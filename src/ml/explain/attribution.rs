use super::tree_shap::ShapValues;
use crate::error::{IdsightError, Result};
use serde::{Deserialize, Serialize};

/// Per-feature additive contributions toward one class score of one row.
///
/// `baseline + per_feature.iter().sum()` reconstructs the model's raw score
/// for `class_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub per_feature: Vec<f64>,
    pub baseline: f64,
    pub class_index: usize,
}

impl Attribution {
    pub fn total(&self) -> f64 {
        self.per_feature.iter().sum()
    }

    pub fn reconstructed_score(&self) -> f64 {
        self.baseline + self.total()
    }
}

/// Units of a single-output attribution vector; decides how the other class
/// of a binary model is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputScale {
    Probability,
    Margin,
}

/// Attribution output in the shapes explainers hand back. Either shape may
/// carry a trailing bias column.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAttribution {
    /// One vector describing class 1 of a binary model.
    Single {
        values: Vec<f64>,
        baseline: f64,
        scale: OutputScale,
    },
    /// `values[class][feature]` with one baseline per class.
    PerClass {
        values: Vec<Vec<f64>>,
        baselines: Vec<f64>,
    },
}

impl From<ShapValues> for RawAttribution {
    fn from(shap: ShapValues) -> Self {
        let n_classes = shap.expected.len();
        let values = (0..n_classes).map(|k| shap.for_class(k)).collect();
        RawAttribution::PerClass {
            values,
            baselines: shap.expected,
        }
    }
}

impl RawAttribution {
    /// Reduce to the attribution for `class_index` over exactly `n_features`
    /// features. This is the only place that inspects the raw shape.
    pub fn normalize(self, class_index: usize, n_features: usize) -> Result<Attribution> {
        let (values, baseline) = match self {
            RawAttribution::Single {
                values,
                baseline,
                scale,
            } => match class_index {
                1 => (values, baseline),
                0 => {
                    let negated = values.into_iter().map(|v| -v).collect();
                    let complement = match scale {
                        OutputScale::Probability => 1.0 - baseline,
                        OutputScale::Margin => -baseline,
                    };
                    (negated, complement)
                }
                other => {
                    return Err(IdsightError::Validation(format!(
                        "Single-output attribution cannot describe class {}",
                        other
                    )))
                }
            },
            RawAttribution::PerClass {
                mut values,
                baselines,
            } => {
                if class_index >= values.len() || class_index >= baselines.len() {
                    return Err(IdsightError::Validation(format!(
                        "No attribution for class {} ({} classes available)",
                        class_index,
                        values.len()
                    )));
                }
                (values.swap_remove(class_index), baselines[class_index])
            }
        };

        let per_feature = strip_bias(values, n_features)?;
        Ok(Attribution {
            per_feature,
            baseline,
            class_index,
        })
    }
}

/// Accept exactly `n_features` values, or one extra trailing bias entry that
/// gets dropped.
pub fn strip_bias(mut values: Vec<f64>, n_features: usize) -> Result<Vec<f64>> {
    if n_features > 0 && values.len() == n_features + 1 {
        values.pop();
    }
    if values.len() != n_features || n_features == 0 {
        return Err(IdsightError::AttributionShapeMismatch {
            attributions: values.len(),
            features: n_features,
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_class_selects_row_and_baseline() {
        let raw = RawAttribution::PerClass {
            values: vec![vec![0.1, -0.2], vec![-0.1, 0.2]],
            baselines: vec![0.6, 0.4],
        };
        let attribution = raw.normalize(1, 2).unwrap();
        assert_eq!(attribution.per_feature, vec![-0.1, 0.2]);
        assert_eq!(attribution.baseline, 0.4);
        assert!((attribution.reconstructed_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_vector_for_negative_class() {
        let raw = RawAttribution::Single {
            values: vec![0.3, -0.1],
            baseline: 0.4,
            scale: OutputScale::Probability,
        };
        let attribution = raw.normalize(0, 2).unwrap();
        assert_eq!(attribution.per_feature, vec![-0.3, 0.1]);
        assert!((attribution.baseline - 0.6).abs() < 1e-12);
        // class 1 score 0.6, so class 0 score 0.4
        assert!((attribution.reconstructed_score() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_trailing_bias_is_dropped() {
        let raw = RawAttribution::Single {
            values: vec![0.5, 0.25, 9.0],
            baseline: -1.0,
            scale: OutputScale::Margin,
        };
        let attribution = raw.normalize(1, 2).unwrap();
        assert_eq!(attribution.per_feature, vec![0.5, 0.25]);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = strip_bias(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert!(matches!(
            result,
            Err(IdsightError::AttributionShapeMismatch {
                attributions: 4,
                features: 2
            })
        ));
        assert!(strip_bias(vec![], 0).is_err());
    }
}
