use crate::config::ExplanationConfig;
use crate::error::{IdsightError, Result};
use crate::ml::explain::strip_bias;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inputs for explaining one prediction. `attribution_values` may carry one
/// trailing bias entry beyond `feature_names`.
#[derive(Debug, Clone, Copy)]
pub struct ExplanationRequest<'a> {
    pub attribution_values: &'a [f64],
    pub feature_names: &'a [String],
    pub feature_values: &'a [f64],
    pub predicted_label: &'a str,
    pub other_label: &'a str,
    pub baseline: f64,
    /// Score the model itself reported; checked against the decomposition
    /// when present.
    pub model_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub feature: String,
    pub value: f64,
    pub attribution: f64,
}

/// How the evidence relates to the predicted label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Net attribution pushed toward the predicted label.
    ReinforcedByEvidence,
    /// Net attribution pushed away, but the baseline carried the label.
    HeldDespiteEvidence,
    /// Net attribution is zero within epsilon.
    BaselineDriven,
}

impl Verdict {
    pub fn classify(total_attribution: f64, epsilon: f64) -> Self {
        if total_attribution > epsilon {
            Verdict::ReinforcedByEvidence
        } else if total_attribution < -epsilon {
            Verdict::HeldDespiteEvidence
        } else {
            Verdict::BaselineDriven
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    pub predicted_label: String,
    pub other_label: String,
    /// Positive attributions, largest first.
    pub supporting: Vec<Contributor>,
    /// Negative attributions, largest magnitude first.
    pub opposing: Vec<Contributor>,
    pub baseline: f64,
    pub total_attribution: f64,
    pub final_score: f64,
    pub verdict: Verdict,
}

impl ExplanationReport {
    pub fn narrative(&self) -> String {
        let mut text = format!(
            "Predicted '{}' with score {:.4} (baseline {:.4}, net evidence {:+.4}).\n",
            self.predicted_label, self.final_score, self.baseline, self.total_attribution
        );

        if !self.supporting.is_empty() {
            text.push_str(&format!("Evidence for '{}':\n", self.predicted_label));
            for c in &self.supporting {
                text.push_str(&format!(
                    "  - {} = {:.2} raised the score by {:.4}\n",
                    c.feature, c.value, c.attribution
                ));
            }
        }
        if !self.opposing.is_empty() {
            text.push_str(&format!("Evidence for '{}':\n", self.other_label));
            for c in &self.opposing {
                text.push_str(&format!(
                    "  - {} = {:.2} lowered the score by {:.4}\n",
                    c.feature,
                    c.value,
                    c.attribution.abs()
                ));
            }
        }

        let verdict = match self.verdict {
            Verdict::ReinforcedByEvidence => format!(
                "The features reinforce the '{}' prediction.",
                self.predicted_label
            ),
            Verdict::HeldDespiteEvidence => format!(
                "The features lean toward '{}', but the baseline was high enough for '{}' to hold.",
                self.other_label, self.predicted_label
            ),
            Verdict::BaselineDriven => format!(
                "No feature moved the score; '{}' follows from the baseline alone.",
                self.predicted_label
            ),
        };
        text.push_str(&verdict);
        text
    }
}

/// Result handed to presentation. Never an error: malformed inputs give
/// [`Explanation::Unavailable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Explanation {
    Available(ExplanationReport),
    Unavailable {
        predicted_label: String,
        reason: String,
    },
}

impl Explanation {
    pub fn is_available(&self) -> bool {
        matches!(self, Explanation::Available(_))
    }

    pub fn report(&self) -> Option<&ExplanationReport> {
        match self {
            Explanation::Available(report) => Some(report),
            Explanation::Unavailable { .. } => None,
        }
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Explanation::Available(report) => f.write_str(&report.narrative()),
            Explanation::Unavailable {
                predicted_label,
                reason,
            } => write!(
                f,
                "Predicted '{}'. Explanation unavailable: {}",
                predicted_label, reason
            ),
        }
    }
}

pub struct ExplanationGenerator {
    top_n: usize,
    identity_tolerance: f64,
    verdict_epsilon: f64,
}

impl ExplanationGenerator {
    pub fn new(config: &ExplanationConfig) -> Self {
        Self {
            top_n: config.top_n,
            identity_tolerance: config.identity_tolerance,
            verdict_epsilon: config.verdict_epsilon,
        }
    }

    pub fn try_explain(&self, request: &ExplanationRequest<'_>) -> Result<ExplanationReport> {
        let n_features = request.feature_names.len();
        if request.feature_values.len() != n_features {
            return Err(IdsightError::Validation(format!(
                "{} feature values for {} feature names",
                request.feature_values.len(),
                n_features
            )));
        }
        let attributions = strip_bias(request.attribution_values.to_vec(), n_features)?;
        if !request.baseline.is_finite() || attributions.iter().any(|a| !a.is_finite()) {
            return Err(IdsightError::Validation(
                "Attribution values must be finite".to_string(),
            ));
        }

        let total_attribution: f64 = attributions.iter().sum();
        let final_score = request.baseline + total_attribution;
        if let Some(model_score) = request.model_score {
            if (final_score - model_score).abs() > self.identity_tolerance {
                return Err(IdsightError::AttributionIdentityViolation {
                    expected: model_score,
                    reconstructed: final_score,
                });
            }
        }

        let contributors: Vec<Contributor> = request
            .feature_names
            .iter()
            .zip(request.feature_values)
            .zip(&attributions)
            .map(|((feature, &value), &attribution)| Contributor {
                feature: feature.clone(),
                value,
                attribution,
            })
            .collect();

        let mut supporting: Vec<Contributor> = contributors
            .iter()
            .filter(|c| c.attribution > 0.0)
            .cloned()
            .collect();
        supporting.sort_by(|a, b| b.attribution.total_cmp(&a.attribution));
        supporting.truncate(self.top_n);

        let mut opposing: Vec<Contributor> = contributors
            .into_iter()
            .filter(|c| c.attribution < 0.0)
            .collect();
        opposing.sort_by(|a, b| a.attribution.total_cmp(&b.attribution));
        opposing.truncate(self.top_n);

        Ok(ExplanationReport {
            predicted_label: request.predicted_label.to_string(),
            other_label: request.other_label.to_string(),
            supporting,
            opposing,
            baseline: request.baseline,
            total_attribution,
            final_score,
            verdict: Verdict::classify(total_attribution, self.verdict_epsilon),
        })
    }

    /// Like [`Self::try_explain`], but failures become an unavailable
    /// explanation so the surrounding prediction still goes through.
    pub fn explain(&self, request: &ExplanationRequest<'_>) -> Explanation {
        match self.try_explain(request) {
            Ok(report) => Explanation::Available(report),
            Err(e) => {
                match &e {
                    IdsightError::AttributionIdentityViolation { .. } => {
                        log::error!("Attribution does not reconstruct the model score: {}", e)
                    }
                    _ => log::warn!("Explanation unavailable: {}", e),
                }
                Explanation::Unavailable {
                    predicted_label: request.predicted_label.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl Default for ExplanationGenerator {
    fn default() -> Self {
        Self::new(&ExplanationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    fn request<'a>(
        attributions: &'a [f64],
        feature_names: &'a [String],
        values: &'a [f64],
    ) -> ExplanationRequest<'a> {
        ExplanationRequest {
            attribution_values: attributions,
            feature_names,
            feature_values: values,
            predicted_label: "DDoS",
            other_label: "Benign",
            baseline: 0.4,
            model_score: None,
        }
    }

    #[test]
    fn test_contributors_ranked_and_truncated() {
        let feature_names = names(5);
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let attributions = [0.1, -0.3, 0.25, 0.05, -0.01];
        let generator = ExplanationGenerator::new(&ExplanationConfig {
            top_n: 2,
            ..ExplanationConfig::default()
        });
        let report = generator
            .try_explain(&request(&attributions, &feature_names, &values))
            .unwrap();

        let supporting: Vec<&str> = report.supporting.iter().map(|c| c.feature.as_str()).collect();
        let opposing: Vec<&str> = report.opposing.iter().map(|c| c.feature.as_str()).collect();
        assert_eq!(supporting, vec!["f2", "f0"]);
        assert_eq!(opposing, vec!["f1", "f4"]);
        assert_eq!(report.supporting[0].value, 3.0);
        assert!((report.total_attribution - 0.09).abs() < 1e-12);
        assert!((report.final_score - 0.49).abs() < 1e-12);
        assert_eq!(report.verdict, Verdict::ReinforcedByEvidence);
    }

    #[test]
    fn test_trailing_bias_is_dropped() {
        let feature_names = names(2);
        let values = [0.0, 0.0];
        let attributions = [0.2, 0.1, 99.0];
        let req = ExplanationRequest {
            model_score: Some(0.7),
            ..request(&attributions, &feature_names, &values)
        };
        let report = ExplanationGenerator::default().try_explain(&req).unwrap();
        assert!((report.final_score - 0.7).abs() < 1e-12);
        assert!((report.baseline + report.total_attribution - report.final_score).abs() < 1e-12);
    }

    #[test]
    fn test_net_negative_holds_despite_evidence() {
        let feature_names = names(2);
        let attributions = [-0.2, 0.05];
        let report = ExplanationGenerator::default()
            .try_explain(&request(&attributions, &feature_names, &[1.0, 1.0]))
            .unwrap();
        assert_eq!(report.verdict, Verdict::HeldDespiteEvidence);
    }

    #[test]
    fn test_benign_with_zero_evidence_is_baseline_driven() {
        let feature_names = names(3);
        let attributions = [0.0, -1e-9, 0.0];
        let req = ExplanationRequest {
            predicted_label: "Benign",
            other_label: "DDoS",
            baseline: 0.8,
            ..request(&attributions, &feature_names, &[5.0, 6.0, 7.0])
        };
        let report = ExplanationGenerator::default().try_explain(&req).unwrap();
        assert!(report.supporting.is_empty());
        assert_eq!(report.verdict, Verdict::BaselineDriven);
        assert!(report.narrative().contains("baseline alone"));
    }

    #[test]
    fn test_malformed_inputs_degrade() {
        let generator = ExplanationGenerator::default();
        let feature_names = names(3);

        let short = [0.1];
        let explanation = generator.explain(&request(&short, &feature_names, &[1.0, 2.0, 3.0]));
        assert!(!explanation.is_available());
        assert!(explanation.to_string().contains("unavailable"));

        let empty: [f64; 0] = [];
        let no_features: Vec<String> = Vec::new();
        assert!(!generator.explain(&request(&empty, &no_features, &[])).is_available());

        assert!(matches!(
            generator.try_explain(&request(&short, &feature_names, &[1.0, 2.0, 3.0])),
            Err(IdsightError::AttributionShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_identity_violation_is_surfaced() {
        let feature_names = names(2);
        let attributions = [0.1, 0.1];
        let req = ExplanationRequest {
            model_score: Some(0.9),
            ..request(&attributions, &feature_names, &[0.0, 0.0])
        };
        let generator = ExplanationGenerator::default();
        assert!(matches!(
            generator.try_explain(&req),
            Err(IdsightError::AttributionIdentityViolation { .. })
        ));
        assert!(!generator.explain(&req).is_available());
    }
}
