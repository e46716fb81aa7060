use super::chromosome::Chromosome;
use super::fitness::FitnessRecord;
use super::operators::{
    mutate, roulette_selection, single_point_crossover, tournament_selection, uniform_crossover,
};
use crate::config::{CrossoverKind, SelectionConfig, SelectionMethod};
use rand::Rng;
use std::collections::HashMap;

/// One generation's chromosomes. Never mutated in place; each generation
/// step builds a fresh one from the scored snapshot of the previous.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    members: Vec<Chromosome>,
}

impl Population {
    pub fn random<R: Rng>(size: usize, n_features: usize, rng: &mut R) -> Self {
        Self {
            members: (0..size).map(|_| Chromosome::random(n_features, rng)).collect(),
        }
    }

    pub fn from_members(members: Vec<Chromosome>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Chromosome] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Memo of scores keyed by mask. A chromosome seen in an earlier generation
/// is never trained on again.
#[derive(Debug, Default)]
pub struct FitnessCache {
    scores: HashMap<Chromosome, f64>,
    hits: usize,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chromosome: &Chromosome) -> Option<f64> {
        self.scores.get(chromosome).copied()
    }

    pub fn insert(&mut self, chromosome: Chromosome, score: f64) {
        self.scores.insert(chromosome, score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Distinct members not scored yet, in first-seen order. Members already
    /// cached count as hits.
    pub fn pending(&mut self, population: &Population) -> Vec<Chromosome> {
        let mut pending: Vec<Chromosome> = Vec::new();
        for member in population.members() {
            if self.scores.contains_key(member) {
                self.hits += 1;
            } else if !pending.contains(member) {
                pending.push(member.clone());
            }
        }
        pending
    }
}

/// Build the next generation from a scored snapshot: elites carried over,
/// the rest bred from selected parents and repaired.
pub fn next_generation<R: Rng>(
    scored: &[FitnessRecord],
    config: &SelectionConfig,
    rng: &mut R,
) -> Population {
    let size = config.population_size;
    let mut next: Vec<Chromosome> = Vec::with_capacity(size);

    if scored.is_empty() {
        return Population::from_members(next);
    }

    // Elitism: copy top performers
    let mut ranked: Vec<&FitnessRecord> = scored.iter().collect();
    ranked.sort_by(|a, b| b.cmp_rank(a));
    for record in ranked.iter().take(config.elite_count.min(size)) {
        next.push(record.chromosome.clone());
    }

    while next.len() < size {
        if rng.gen::<f64>() < config.crossover_rate {
            let parent1 = select_parent(scored, config, rng);
            let parent2 = select_parent(scored, config, rng);

            let (mut child1, mut child2) = match config.crossover_kind {
                CrossoverKind::Uniform => uniform_crossover(&parent1, &parent2, rng),
                CrossoverKind::SinglePoint => single_point_crossover(&parent1, &parent2, rng),
            };

            mutate(&mut child1, config.mutation_rate, rng);
            mutate(&mut child2, config.mutation_rate, rng);
            child1.repair(rng);
            child2.repair(rng);

            next.push(child1);
            if next.len() < size {
                next.push(child2);
            }
        } else {
            // Reproduction (copy)
            let mut child = select_parent(scored, config, rng);
            mutate(&mut child, config.mutation_rate, rng);
            child.repair(rng);
            next.push(child);
        }
    }

    Population::from_members(next)
}

fn select_parent<R: Rng>(
    scored: &[FitnessRecord],
    config: &SelectionConfig,
    rng: &mut R,
) -> Chromosome {
    match config.selection_method {
        SelectionMethod::Tournament => tournament_selection(scored, config.tournament_size, rng),
        SelectionMethod::Roulette => roulette_selection(scored, rng),
    }
}
