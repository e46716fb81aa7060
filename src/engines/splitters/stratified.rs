use super::types::{DataSplit, SplitConfig};
use crate::error::{IdsightError, Result};
use crate::types::LabelVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Train/holdout split that keeps every class's share in both partitions.
pub struct StratifiedSplitter {
    config: SplitConfig,
}

impl StratifiedSplitter {
    pub fn new(holdout_fraction: f64, seed: u64) -> Self {
        Self {
            config: SplitConfig {
                holdout_fraction,
                seed,
            },
        }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Each class sends `round(count * fraction)` rows to the holdout side,
    /// clamped so both sides get at least one row. Classes with fewer than
    /// two rows cannot be split; `class_names` labels the error.
    pub fn split(&self, labels: &LabelVector, class_names: &[String]) -> Result<DataSplit> {
        let fraction = self.config.holdout_fraction;
        if fraction <= 0.0 || fraction >= 1.0 {
            return Err(IdsightError::Validation(
                "Invalid split: holdout fraction must be between 0 and 1".to_string(),
            ));
        }

        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); labels.n_classes()];
        for (i, &c) in labels.codes().iter().enumerate() {
            by_class[c].push(i);
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut holdout = Vec::new();

        for (class, mut rows) in by_class.into_iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            if rows.len() < 2 {
                return Err(IdsightError::SplitStratificationFailure {
                    class: class_names
                        .get(class)
                        .cloned()
                        .unwrap_or_else(|| class.to_string()),
                    count: rows.len(),
                });
            }
            rows.shuffle(&mut rng);
            let n_holdout = ((rows.len() as f64 * fraction).round() as usize).clamp(1, rows.len() - 1);
            holdout.extend_from_slice(&rows[..n_holdout]);
            train.extend_from_slice(&rows[n_holdout..]);
        }

        train.sort_unstable();
        holdout.sort_unstable();
        Ok(DataSplit { train, holdout })
    }
}
