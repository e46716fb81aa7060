use crate::config::{ConfigSection, TrainingConfig};
use crate::engines::metrics::{EvaluationMetrics, MetricsEngine};
use crate::engines::splitters::{DataSplit, StratifiedSplitter};
use crate::error::{IdsightError, Result};
use crate::ml::models::{Classifier, RandomForest};
use crate::types::{FeatureMatrix, LabelVector};

/// Final model plus the scores it earned on the held-out test rows.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub metrics: EvaluationMetrics,
    pub split: DataSplit,
}

pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on a stratified training partition of `features` (already
    /// projected onto the selected columns) and score on the test partition.
    ///
    /// A class too small to stratify aborts the run; there is no fallback to
    /// an unstratified split.
    pub fn train_and_evaluate(
        &self,
        features: &FeatureMatrix,
        labels: &LabelVector,
        class_names: &[String],
    ) -> Result<TrainingOutcome> {
        if features.n_rows() != labels.len() {
            return Err(IdsightError::Validation(format!(
                "{} rows but {} labels",
                features.n_rows(),
                labels.len()
            )));
        }
        if class_names.len() != labels.n_classes() {
            return Err(IdsightError::Validation(format!(
                "{} class names for {} classes",
                class_names.len(),
                labels.n_classes()
            )));
        }

        let split = StratifiedSplitter::new(self.config.test_fraction, self.config.split_seed)
            .split(labels, class_names)?;
        log::info!(
            "Training on {} rows x {} features, testing on {} rows",
            split.train.len(),
            features.n_features(),
            split.holdout.len()
        );

        let train_x = features.take_rows(&split.train);
        let train_y = labels.take(&split.train);
        let model = RandomForest::fit(&train_x, &train_y, &self.config.forest)?;

        let test_x = features.take_rows(&split.holdout);
        let test_y = labels.take(&split.holdout);
        let predictions = model.predict_matrix(&test_x);

        let metrics = MetricsEngine::new(class_names).calculate_all(test_y.codes(), &predictions)?;
        log::info!(
            "Test accuracy {:.4}, macro precision {:.4}, recall {:.4}, F1 {:.4}",
            metrics.accuracy,
            metrics.precision,
            metrics.recall,
            metrics.f1_score
        );

        Ok(TrainingOutcome {
            model,
            metrics,
            split,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::ForestParams;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn three_classes() -> (FeatureMatrix, LabelVector, Vec<String>) {
        let mut rng = StdRng::seed_from_u64(17);
        let mut rows = Vec::new();
        let mut codes = Vec::new();
        for i in 0..90 {
            let class = i % 3;
            rows.push(vec![
                class as f64 * 3.0 + rng.gen_range(-0.5..0.5),
                rng.gen_range(0.0..1.0),
            ]);
            codes.push(class);
        }
        (
            FeatureMatrix::from_rows(vec!["Flow Duration".into(), "Dst Port".into()], rows)
                .unwrap(),
            LabelVector::new(codes, 3).unwrap(),
            vec!["Benign".into(), "Bot".into(), "DDoS".into()],
        )
    }

    fn trainer() -> ModelTrainer {
        ModelTrainer::new(TrainingConfig {
            forest: ForestParams {
                n_trees: 10,
                ..ForestParams::default()
            },
            ..TrainingConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_train_and_evaluate_separable() {
        let (x, y, names) = three_classes();
        let outcome = trainer().train_and_evaluate(&x, &y, &names).unwrap();
        assert!(outcome.metrics.accuracy > 0.9);
        assert_eq!(outcome.metrics.confusion_matrix.total(), outcome.split.holdout.len());
        assert_eq!(outcome.model.n_features(), 2);
    }

    #[test]
    fn test_confusion_sums_match_test_split() {
        let (x, y, names) = three_classes();
        let outcome = trainer().train_and_evaluate(&x, &y, &names).unwrap();
        let test_y = y.take(&outcome.split.holdout);
        let predicted = outcome
            .model
            .predict_matrix(&x.take_rows(&outcome.split.holdout));

        let cm = &outcome.metrics.confusion_matrix;
        let mut predicted_counts = vec![0; 3];
        for p in predicted {
            predicted_counts[p] += 1;
        }
        assert_eq!(cm.row_sums(), test_y.class_counts());
        assert_eq!(cm.column_sums(), predicted_counts);
    }

    #[test]
    fn test_tiny_class_fails_stratification() {
        let x = FeatureMatrix::from_rows(
            vec!["a".into()],
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
        )
        .unwrap();
        let y = LabelVector::new(vec![0, 0, 0, 0, 1], 2).unwrap();
        let names = vec!["Benign".to_string(), "Infiltration".to_string()];
        let result = trainer().train_and_evaluate(&x, &y, &names);
        match result {
            Err(IdsightError::SplitStratificationFailure { class, count }) => {
                assert_eq!(class, "Infiltration");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected result: {:?}", other.map(|o| o.metrics)),
        }
    }
}
