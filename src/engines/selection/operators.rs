use super::chromosome::Chromosome;
use super::fitness::FitnessRecord;
use rand::Rng;
use std::cmp::Ordering;

/// Tournament selection: pick best of K random candidates
pub fn tournament_selection<R: Rng>(
    population: &[FitnessRecord],
    tournament_size: usize,
    rng: &mut R,
) -> Chromosome {
    let mut best = &population[rng.gen_range(0..population.len())];

    for _ in 1..tournament_size {
        let challenger = &population[rng.gen_range(0..population.len())];
        if challenger.cmp_rank(best) == Ordering::Greater {
            best = challenger;
        }
    }

    best.chromosome.clone()
}

/// Roulette wheel selection: probability proportional to fitness
pub fn roulette_selection<R: Rng>(population: &[FitnessRecord], rng: &mut R) -> Chromosome {
    let total_fitness: f64 = population.iter().map(|r| r.score.max(0.0)).sum();

    if total_fitness <= 0.0 {
        // Nothing scored above zero, pick uniformly
        return population[rng.gen_range(0..population.len())]
            .chromosome
            .clone();
    }

    let mut spin = rng.gen::<f64>() * total_fitness;

    for record in population {
        spin -= record.score.max(0.0);
        if spin <= 0.0 {
            return record.chromosome.clone();
        }
    }

    // Fallback
    population[population.len() - 1].chromosome.clone()
}

/// Single-point crossover: swap the gene tails after a random cut
pub fn single_point_crossover<R: Rng>(
    parent1: &Chromosome,
    parent2: &Chromosome,
    rng: &mut R,
) -> (Chromosome, Chromosome) {
    let len = parent1.len().min(parent2.len());
    if len <= 1 {
        return (parent1.clone(), parent2.clone());
    }

    let point = rng.gen_range(1..len);

    let mut child1 = parent1.clone();
    let mut child2 = parent2.clone();

    child1.genes_mut()[point..len].copy_from_slice(&parent2.genes()[point..len]);
    child2.genes_mut()[point..len].copy_from_slice(&parent1.genes()[point..len]);

    (child1, child2)
}

/// Uniform crossover: each gene comes from either parent with equal odds
pub fn uniform_crossover<R: Rng>(
    parent1: &Chromosome,
    parent2: &Chromosome,
    rng: &mut R,
) -> (Chromosome, Chromosome) {
    let mut child1 = parent1.clone();
    let mut child2 = parent2.clone();
    let len = parent1.len().min(parent2.len());

    for i in 0..len {
        if rng.gen_bool(0.5) {
            child1.genes_mut()[i] = parent2.genes()[i];
            child2.genes_mut()[i] = parent1.genes()[i];
        }
    }

    (child1, child2)
}

/// Mutation: flip each gene independently
pub fn mutate<R: Rng>(chromosome: &mut Chromosome, mutation_rate: f64, rng: &mut R) {
    for gene in chromosome.genes_mut().iter_mut() {
        if rng.gen::<f64>() < mutation_rate {
            *gene = !*gene;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(genes: &[bool], score: f64) -> FitnessRecord {
        FitnessRecord {
            chromosome: Chromosome::from_genes(genes.to_vec()),
            score,
        }
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let population = vec![record(&[true, false], 0.2), record(&[false, true], 0.9)];
        let mut rng = StdRng::seed_from_u64(3);
        let wins = (0..200)
            .filter(|_| {
                tournament_selection(&population, 4, &mut rng).genes() == [false, true]
            })
            .count();
        assert!(wins > 150);
    }

    #[test]
    fn test_roulette_never_picks_zero_score_when_others_positive() {
        let population = vec![record(&[true, false], 0.0), record(&[false, true], 0.5)];
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert_eq!(roulette_selection(&population, &mut rng).genes(), [false, true]);
        }
    }

    #[test]
    fn test_crossover_conserves_genes() {
        let a = Chromosome::from_genes(vec![true; 6]);
        let b = Chromosome::from_genes(vec![false; 6]);
        let mut rng = StdRng::seed_from_u64(9);
        for (c1, c2) in [
            single_point_crossover(&a, &b, &mut rng),
            uniform_crossover(&a, &b, &mut rng),
        ] {
            assert_eq!(c1.len(), 6);
            for i in 0..6 {
                assert_ne!(c1.genes()[i], c2.genes()[i]);
            }
        }
    }

    #[test]
    fn test_mutation_rate_extremes() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut c = Chromosome::from_genes(vec![true, false, true]);
        mutate(&mut c, 0.0, &mut rng);
        assert_eq!(c.genes(), [true, false, true]);
        mutate(&mut c, 1.0, &mut rng);
        assert_eq!(c.genes(), [false, true, false]);
    }
}
