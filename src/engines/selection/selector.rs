use super::chromosome::Chromosome;
use super::fitness::{FitnessEvaluator, FitnessRecord, WORST_FITNESS};
use super::population::{next_generation, FitnessCache, Population};
use super::progress::SilentProgress;
use crate::config::{ConfigSection, SelectionConfig};
use crate::error::{IdsightError, Result};
use crate::types::{FeatureMatrix, LabelVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, evaluated: usize);
    fn on_chromosome_evaluated(&mut self, current: usize, total: usize);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_score: f64,
    pub mean_score: f64,
    pub best_ever_score: f64,
    pub new_evaluations: usize,
}

/// Outcome of a selection run. `score` is the best validation accuracy seen
/// in any generation, not only the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected_features: Vec<String>,
    pub chromosome: Chromosome,
    pub score: f64,
    pub total_features: usize,
    pub generations_run: usize,
    pub evaluations: usize,
    pub history: Vec<GenerationStats>,
}

impl SelectionResult {
    pub fn selected_indices(&self) -> Vec<usize> {
        self.chromosome.selected_indices()
    }
}

/// Genetic search over feature masks.
pub struct GeneticSelector {
    config: SelectionConfig,
    class_names: Vec<String>,
    cancel: Option<Arc<AtomicBool>>,
}

impl GeneticSelector {
    pub fn new(config: SelectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            class_names: Vec::new(),
            cancel: None,
        })
    }

    /// Names used when reporting classes that are too small to split.
    pub fn with_class_names(mut self, class_names: Vec<String>) -> Self {
        self.class_names = class_names;
        self
    }

    /// The flag is checked before each generation and again after the
    /// parallel evaluation barrier.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(AtomicOrdering::SeqCst))
    }

    /// Run the evolution process
    pub fn select<C: ProgressCallback>(
        &self,
        features: &FeatureMatrix,
        labels: &LabelVector,
        callback: &mut C,
    ) -> Result<SelectionResult> {
        let n_features = features.n_features();
        let evaluator = FitnessEvaluator::new(
            features,
            labels,
            &self.class_names,
            self.config.validation_fraction,
            self.config.split_seed,
            self.config.fitness_model.clone(),
        )?;

        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!(
            "Selecting features: {} candidates, population {}, {} generations",
            n_features,
            self.config.population_size,
            self.config.generations
        );

        let mut population = Population::random(self.config.population_size, n_features, &mut rng);
        let mut cache = FitnessCache::new();
        let mut best_ever: Option<FitnessRecord> = None;
        let mut history = Vec::with_capacity(self.config.generations);
        let mut stale_generations = 0;

        for generation in 0..self.config.generations {
            if self.cancelled() {
                return Err(IdsightError::Cancelled {
                    completed_generations: generation,
                });
            }
            callback.on_generation_start(generation);

            let pending = cache.pending(&population);
            let fresh: Vec<(Chromosome, f64)> = pending
                .into_par_iter()
                .map(|chromosome| {
                    let score = evaluator.evaluate(&chromosome);
                    (chromosome, score)
                })
                .collect();

            // Results computed after a cancel request are dropped
            if self.cancelled() {
                return Err(IdsightError::Cancelled {
                    completed_generations: generation,
                });
            }

            let new_evaluations = fresh.len();
            for (i, (chromosome, score)) in fresh.into_iter().enumerate() {
                callback.on_chromosome_evaluated(i + 1, new_evaluations);
                cache.insert(chromosome, score);
            }

            let scored: Vec<FitnessRecord> = population
                .members()
                .iter()
                .map(|chromosome| FitnessRecord {
                    chromosome: chromosome.clone(),
                    score: cache.get(chromosome).unwrap_or(WORST_FITNESS),
                })
                .collect();

            let generation_best = scored
                .iter()
                .max_by(|a, b| a.cmp_rank(b))
                .cloned()
                .ok_or_else(|| IdsightError::Validation("Empty population".to_string()))?;

            let improved = best_ever
                .as_ref()
                .map_or(true, |best| generation_best.cmp_rank(best) == Ordering::Greater);
            if improved {
                best_ever = Some(generation_best.clone());
                stale_generations = 0;
            } else {
                stale_generations += 1;
            }
            let best_ever_score = best_ever.as_ref().map_or(WORST_FITNESS, |b| b.score);

            let mean_score = scored.iter().map(|r| r.score).sum::<f64>() / scored.len() as f64;
            history.push(GenerationStats {
                generation,
                best_score: generation_best.score,
                mean_score,
                best_ever_score,
                new_evaluations,
            });
            callback.on_generation_complete(generation, best_ever_score, cache.len());

            if let Some(patience) = self.config.patience {
                if stale_generations >= patience {
                    log::info!(
                        "No improvement for {} generation(s), stopping after generation {}",
                        stale_generations,
                        generation + 1
                    );
                    break;
                }
            }

            if generation + 1 < self.config.generations {
                population = next_generation(&scored, &self.config, &mut rng);
            }
        }

        let best = best_ever.ok_or_else(|| {
            IdsightError::Validation("Selection finished without evaluating a subset".to_string())
        })?;
        let selected_features = best
            .chromosome
            .selected_indices()
            .into_iter()
            .map(|i| features.feature_names()[i].clone())
            .collect::<Vec<_>>();

        log::info!(
            "Selected {} of {} features with validation accuracy {:.4} ({} subsets trained, {} cache hits)",
            selected_features.len(),
            n_features,
            best.score,
            cache.len(),
            cache.hits()
        );

        Ok(SelectionResult {
            selected_features,
            score: best.score,
            chromosome: best.chromosome,
            total_features: n_features,
            generations_run: history.len(),
            evaluations: cache.len(),
            history,
        })
    }
}

/// Convenience wrapper that runs a selector without progress reporting.
pub fn select(
    features: &FeatureMatrix,
    labels: &LabelVector,
    config: &SelectionConfig,
) -> Result<SelectionResult> {
    GeneticSelector::new(config.clone())?.select(features, labels, &mut SilentProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::selection::progress::{ChannelProgressCallback, ProgressMessage};
    use rand::Rng;

    fn dataset() -> (FeatureMatrix, LabelVector) {
        let mut rng = StdRng::seed_from_u64(31);
        let mut rows = Vec::new();
        let mut codes = Vec::new();
        for i in 0..80 {
            let class = i % 2;
            let mut row: Vec<f64> = (0..5).map(|_| rng.gen_range(-1.0..1.0)).collect();
            row[2] += class as f64 * 5.0;
            rows.push(row);
            codes.push(class);
        }
        let names = (0..5).map(|i| format!("f{}", i)).collect();
        (
            FeatureMatrix::from_rows(names, rows).unwrap(),
            LabelVector::new(codes, 2).unwrap(),
        )
    }

    fn small_config() -> SelectionConfig {
        let mut config = SelectionConfig {
            population_size: 8,
            generations: 4,
            ..SelectionConfig::default()
        };
        config.fitness_model.n_trees = 4;
        config
    }

    #[test]
    fn test_best_ever_is_monotonic() {
        let (x, y) = dataset();
        let result = select(&x, &y, &small_config()).unwrap();
        assert_eq!(result.generations_run, 4);
        for pair in result.history.windows(2) {
            assert!(pair[1].best_ever_score >= pair[0].best_ever_score);
        }
        assert_eq!(result.score, result.history.last().unwrap().best_ever_score);
        assert!(result.chromosome.is_valid_for(5));
        assert_eq!(result.total_features, 5);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (x, y) = dataset();
        let a = select(&x, &y, &small_config()).unwrap();
        let b = select(&x, &y, &small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cancellation_before_start() {
        let (x, y) = dataset();
        let flag = Arc::new(AtomicBool::new(true));
        let selector = GeneticSelector::new(small_config())
            .unwrap()
            .with_cancellation(flag);
        let result = selector.select(&x, &y, &mut SilentProgress);
        assert!(matches!(
            result,
            Err(IdsightError::Cancelled {
                completed_generations: 0
            })
        ));
    }

    #[test]
    fn test_patience_stops_early() {
        let (x, y) = dataset();
        let config = SelectionConfig {
            generations: 30,
            patience: Some(1),
            ..small_config()
        };
        let result = select(&x, &y, &config).unwrap();
        assert!(result.generations_run < 30);
    }

    #[test]
    fn test_channel_progress_reports_each_generation() {
        let (x, y) = dataset();
        let (tx, rx) = std::sync::mpsc::channel();
        let mut callback = ChannelProgressCallback::new(tx);
        GeneticSelector::new(small_config())
            .unwrap()
            .select(&x, &y, &mut callback)
            .unwrap();
        drop(callback);

        let completed = rx
            .iter()
            .filter(|m| matches!(m, ProgressMessage::GenerationComplete { .. }))
            .count();
        assert_eq!(completed, 4);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SelectionConfig {
            population_size: 0,
            ..SelectionConfig::default()
        };
        assert!(matches!(
            GeneticSelector::new(config),
            Err(IdsightError::Configuration(_))
        ));
    }
}
