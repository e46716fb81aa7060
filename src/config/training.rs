use super::traits::ConfigSection;
use crate::error::IdsightError;
use crate::ml::models::ForestParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
        }
    }
}

impl ConfigSection for TrainingConfig {
    fn section_name() -> &'static str {
        "training"
    }

    fn validate(&self) -> Result<(), IdsightError> {
        if self.test_fraction <= 0.0 || self.test_fraction >= 1.0 {
            return Err(IdsightError::Configuration(
                "Test fraction must be between 0 and 1".to_string(),
            ));
        }
        self.forest.validate()
    }
}
