use super::traits::ConfigSection;
use crate::error::IdsightError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub top_n: usize,
    /// Allowed gap between baseline + attributions and the model score.
    pub identity_tolerance: f64,
    /// Band around zero inside which the net attribution counts as zero.
    pub verdict_epsilon: f64,
    pub benign_label: String,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            identity_tolerance: 1e-6,
            verdict_epsilon: 1e-6,
            benign_label: "Benign".to_string(),
        }
    }
}

impl ConfigSection for ExplanationConfig {
    fn section_name() -> &'static str {
        "explanation"
    }

    fn validate(&self) -> Result<(), IdsightError> {
        if self.top_n == 0 {
            return Err(IdsightError::Configuration(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.identity_tolerance.is_nan()
            || self.identity_tolerance <= 0.0
            || self.verdict_epsilon.is_nan()
            || self.verdict_epsilon < 0.0
        {
            return Err(IdsightError::Configuration(
                "identity_tolerance must be positive and verdict_epsilon non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
