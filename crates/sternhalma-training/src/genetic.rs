//! Population and generation-to-generation evolution.
//!
//! Fitness comes from round-robin games (see [`crate::scheduler`]). Once a
//! generation has played, [`PopulationEvolver::evolve`] builds the next one:
//!
//! 1. **Sort** - individuals by fitness, descending; the sort is stable so
//!    ties keep population order
//! 2. **Elitism** - the top `elite_count` genomes are carried over unchanged
//! 3. **Tournament selection** - `tournament_size` individuals are sampled
//!    without replacement and the fittest becomes a parent
//! 4. **Crossover** - two parents are blended with BLX-α
//! 5. **Mutation** - Gaussian, per field, clamped to the field's bounds
//!
//! Every individual of the new generation starts with a clean score.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand_pcg::Pcg32;
//! use sternhalma_training::genetic::{InitStrategy, Population, PopulationEvolver};
//!
//! let mut rng = Pcg32::seed_from_u64(0);
//! let evolver = PopulationEvolver {
//!     elite_count: 2,
//!     tournament_size: 3,
//!     blx_alpha: 0.3,
//!     mutation_rate: 0.2,
//!     mutation_strength: 0.1,
//! };
//! let population = Population::init(InitStrategy::Defaults, 6, &evolver, &mut rng);
//! let next = evolver.evolve(&population, &mut rng);
//! assert_eq!(next.len(), 6);
//! ```

use std::cmp::Ordering;

use rand::{Rng, seq::index};
use serde::{Deserialize, Serialize};
use sternhalma_evaluator::genome::{Genome, GenomeField};
use sternhalma_stats::summary::Summary;

use crate::genome_ops;

/// A candidate genome and its score in the current generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Individual {
    pub genome: Genome,
    pub fitness: f64,
    pub wins: u32,
    pub games_played: u32,
}

impl Individual {
    #[must_use]
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: 0.0,
            wins: 0,
            games_played: 0,
        }
    }
}

/// How the first generation is built.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum InitStrategy {
    /// Every field uniform within its bounds.
    Random,
    /// The hand-tuned genome plus mutated copies of it.
    #[default]
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    #[must_use]
    pub fn new(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    pub fn init<R>(
        strategy: InitStrategy,
        size: usize,
        evolver: &PopulationEvolver,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..size)
            .map(|i| {
                let genome = match strategy {
                    InitStrategy::Random => genome_ops::random(rng),
                    InitStrategy::Defaults if i == 0 => Genome::default(),
                    InitStrategy::Defaults => genome_ops::mutate(
                        &Genome::default(),
                        evolver.mutation_strength,
                        evolver.mutation_rate,
                        rng,
                    ),
                };
                Individual::new(genome)
            })
            .collect();
        Self { individuals }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// The fittest individual; the earliest one on ties.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .reduce(|best, ind| if ind.fitness > best.fitness { ind } else { best })
    }

    /// Stable sort by fitness, descending.
    pub fn sort_by_fitness(&mut self) {
        self.individuals
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    #[must_use]
    pub fn fitness_stats(&self) -> Option<Summary> {
        Summary::new(self.individuals.iter().map(|ind| ind.fitness))
    }

    /// Statistics of every genome field across the population, in
    /// [`GenomeField::ALL`] order.
    #[must_use]
    pub fn field_stats(&self) -> Vec<(GenomeField, Summary)> {
        GenomeField::ALL
            .into_iter()
            .filter_map(|field| {
                let values = self.individuals.iter().map(|ind| ind.genome.get(field));
                Summary::new(values).map(|stats| (field, stats))
            })
            .collect()
    }
}

/// Parameters for producing the next generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationEvolver {
    /// Number of top individuals carried over unchanged.
    pub elite_count: usize,
    /// Individuals per tournament (larger = stronger selection pressure).
    pub tournament_size: usize,
    /// BLX-α range expansion.
    pub blx_alpha: f64,
    /// Probability of mutating each field.
    pub mutation_rate: f64,
    /// Mutation standard deviation, relative to the width of a field's bounds.
    pub mutation_strength: f64,
}

impl PopulationEvolver {
    /// Builds the next generation. Its size always equals the input size.
    #[must_use]
    pub fn evolve<R>(&self, population: &Population, rng: &mut R) -> Population
    where
        R: Rng + ?Sized,
    {
        let mut ranked = population.clone();
        ranked.sort_by_fitness();
        let ranked = ranked.individuals;
        let size = ranked.len();
        if size == 0 {
            return Population::new(vec![]);
        }

        let mut next: Vec<_> = ranked
            .iter()
            .take(self.elite_count)
            .map(|ind| Individual::new(ind.genome))
            .collect();
        let tournament_size = self.tournament_size.clamp(1, size);
        while next.len() < size {
            let p1 = tournament_select(&ranked, tournament_size, rng);
            let p2 = tournament_select(&ranked, tournament_size, rng);
            let child = genome_ops::blx_alpha(&p1.genome, &p2.genome, self.blx_alpha, rng);
            let child = genome_ops::mutate(&child, self.mutation_strength, self.mutation_rate, rng);
            next.push(Individual::new(child));
        }
        Population::new(next)
    }
}

// on equal fitness the earlier individual wins
fn tournament_select<'a, R>(
    population: &'a [Individual],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Individual
where
    R: Rng + ?Sized,
{
    assert!(tournament_size > 0 && tournament_size <= population.len());
    let winner = index::sample(rng, population.len(), tournament_size)
        .into_iter()
        .reduce(|best, i| {
            let order = population[i]
                .fitness
                .total_cmp(&population[best].fitness)
                .then(best.cmp(&i));
            if order == Ordering::Greater { i } else { best }
        })
        .unwrap_or(0);
    &population[winner]
}
