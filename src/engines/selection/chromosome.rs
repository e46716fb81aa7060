use rand::Rng;
use serde::{Deserialize, Serialize};

/// Boolean mask over the full feature list, one gene per candidate feature.
///
/// A chromosome is only a valid candidate when at least one gene is set;
/// [`Chromosome::repair`] turns an empty mask into a valid one.
///
/// Ordering is lexicographic over the genes. It is only used to break exact
/// ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chromosome {
    genes: Vec<bool>,
}

impl Chromosome {
    pub fn from_genes(genes: Vec<bool>) -> Self {
        Self { genes }
    }

    pub fn from_indices(len: usize, selected: &[usize]) -> Self {
        let mut genes = vec![false; len];
        for &i in selected.iter().filter(|&&i| i < len) {
            genes[i] = true;
        }
        Self { genes }
    }

    /// Each gene is set with probability one half; the result is repaired.
    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Self {
        let mut chromosome = Self {
            genes: (0..len).map(|_| rng.gen_bool(0.5)).collect(),
        };
        chromosome.repair(rng);
        chromosome
    }

    pub fn genes(&self) -> &[bool] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut [bool] {
        &mut self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn count_selected(&self) -> usize {
        self.genes.iter().filter(|&&g| g).count()
    }

    pub fn has_selection(&self) -> bool {
        self.genes.iter().any(|&g| g)
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        self.genes
            .iter()
            .enumerate()
            .filter_map(|(i, &g)| g.then_some(i))
            .collect()
    }

    /// Switch on one random gene if none is set. Returns whether a repair
    /// was needed.
    pub fn repair<R: Rng>(&mut self, rng: &mut R) -> bool {
        if self.genes.is_empty() || self.has_selection() {
            return false;
        }
        let i = rng.gen_range(0..self.genes.len());
        self.genes[i] = true;
        true
    }

    pub fn is_valid_for(&self, n_features: usize) -> bool {
        self.len() == n_features && self.has_selection()
    }
}

impl std::fmt::Display for Chromosome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &g in &self.genes {
            f.write_str(if g { "1" } else { "0" })?;
        }
        Ok(())
    }
}
