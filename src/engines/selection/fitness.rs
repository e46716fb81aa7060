use super::chromosome::Chromosome;
use crate::engines::splitters::{DataSplit, StratifiedSplitter};
use crate::error::{IdsightError, Result};
use crate::ml::models::{Classifier, ForestParams, RandomForest};
use crate::types::{FeatureMatrix, LabelVector};
use std::cmp::Ordering;

/// Score given to subsets that cannot be evaluated.
pub const WORST_FITNESS: f64 = 0.0;

/// A chromosome together with its validation accuracy.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessRecord {
    pub chromosome: Chromosome,
    pub score: f64,
}

impl FitnessRecord {
    /// `Greater` means `self` ranks ahead of `other`: higher score, then fewer
    /// selected features, then the lexicographically smaller mask.
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| {
                other
                    .chromosome
                    .count_selected()
                    .cmp(&self.chromosome.count_selected())
            })
            .then_with(|| other.chromosome.cmp(&self.chromosome))
    }
}

/// Scores feature subsets by training a small forest on a fixed stratified
/// split and measuring accuracy on the held-out part.
///
/// The split is drawn once at construction so every chromosome in a run is
/// compared on the same rows.
pub struct FitnessEvaluator<'a> {
    features: &'a FeatureMatrix,
    split: DataSplit,
    train_labels: LabelVector,
    holdout_labels: LabelVector,
    model: ForestParams,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(
        features: &'a FeatureMatrix,
        labels: &LabelVector,
        class_names: &[String],
        validation_fraction: f64,
        split_seed: u64,
        model: ForestParams,
    ) -> Result<Self> {
        if features.n_rows() != labels.len() {
            return Err(IdsightError::Validation(format!(
                "{} rows but {} labels",
                features.n_rows(),
                labels.len()
            )));
        }
        let split = StratifiedSplitter::new(validation_fraction, split_seed)
            .split(labels, class_names)?;
        log::debug!(
            "Fitness split: {} training rows, {} validation rows",
            split.train.len(),
            split.holdout.len()
        );

        Ok(Self {
            features,
            train_labels: labels.take(&split.train),
            holdout_labels: labels.take(&split.holdout),
            split,
            model,
        })
    }

    /// Validation accuracy of a forest trained on the selected columns.
    pub fn try_evaluate(&self, chromosome: &Chromosome) -> Result<f64> {
        if chromosome.len() != self.features.n_features() {
            return Err(IdsightError::Validation(format!(
                "Chromosome has {} genes for {} features",
                chromosome.len(),
                self.features.n_features()
            )));
        }
        let columns = chromosome.selected_indices();
        let projected = self.features.project(&columns)?;

        if self.holdout_labels.is_empty() {
            return Err(IdsightError::DegenerateSubset(
                "empty validation split".to_string(),
            ));
        }

        let train_x = projected.take_rows(&self.split.train);
        let forest = RandomForest::fit(&train_x, &self.train_labels, &self.model)?;

        let holdout_x = projected.take_rows(&self.split.holdout);
        let predictions = forest.predict_matrix(&holdout_x);
        let correct = predictions
            .iter()
            .zip(self.holdout_labels.codes())
            .filter(|(p, t)| p == t)
            .count();

        Ok(correct as f64 / self.holdout_labels.len() as f64)
    }

    /// Like [`Self::try_evaluate`] but never fails: subsets that cannot be
    /// trained on score [`WORST_FITNESS`].
    pub fn evaluate(&self, chromosome: &Chromosome) -> f64 {
        match self.try_evaluate(chromosome) {
            Ok(score) => score,
            Err(e) => {
                log::debug!("Chromosome {} scored as worst: {}", chromosome, e);
                WORST_FITNESS
            }
        }
    }
}
