use super::traits::{check_fraction, ConfigSection};
use crate::error::IdsightError;
use crate::ml::models::ForestParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub selection_method: SelectionMethod,
    pub tournament_size: usize,
    pub elite_count: usize,
    pub crossover_kind: CrossoverKind,
    pub random_seed: Option<u64>,
    /// Stop after this many generations without a new best-ever record.
    pub patience: Option<usize>,
    pub validation_fraction: f64,
    pub split_seed: u64,
    pub fitness_model: ForestParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    Tournament,
    Roulette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverKind {
    Uniform,
    SinglePoint,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 10,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            selection_method: SelectionMethod::Tournament,
            tournament_size: 3,
            elite_count: 2,
            crossover_kind: CrossoverKind::Uniform,
            random_seed: Some(42),
            patience: None,
            validation_fraction: 0.2,
            split_seed: 42,
            fitness_model: ForestParams {
                n_trees: 10,
                max_depth: Some(8),
                ..ForestParams::default()
            },
        }
    }
}

impl ConfigSection for SelectionConfig {
    fn section_name() -> &'static str {
        "selection"
    }

    fn validate(&self) -> Result<(), IdsightError> {
        if self.population_size == 0 {
            return Err(IdsightError::Configuration(
                "Population size must be positive".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(IdsightError::Configuration(
                "Generation count must be positive".to_string(),
            ));
        }
        check_fraction(Self::section_name(), "mutation_rate", self.mutation_rate)?;
        check_fraction(Self::section_name(), "crossover_rate", self.crossover_rate)?;
        if self.selection_method == SelectionMethod::Tournament && self.tournament_size < 2 {
            return Err(IdsightError::Configuration(
                "Tournament size must be at least 2".to_string(),
            ));
        }
        if self.elite_count > self.population_size {
            return Err(IdsightError::Configuration(format!(
                "Elite count {} exceeds population size {}",
                self.elite_count, self.population_size
            )));
        }
        if self.patience == Some(0) {
            return Err(IdsightError::Configuration(
                "Patience must be at least one generation".to_string(),
            ));
        }
        if self.validation_fraction <= 0.0 || self.validation_fraction >= 1.0 {
            return Err(IdsightError::Configuration(
                "Validation fraction must be between 0 and 1".to_string(),
            ));
        }
        self.fitness_model.validate()
    }
}
