//! Persisted training progress.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use sternhalma_evaluator::{genome::Genome, insights::SharedInsights, search::SearchParams};

use crate::{
    genetic::{InitStrategy, Population, PopulationEvolver},
    schedule::matchup_schedule,
};

/// Training parameters. Missing JSON fields take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrainingConfig {
    pub population_size: usize,
    pub games_per_matchup: u32,
    /// Generations per cycle.
    pub generations: u32,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub mutation_rate: f64,
    pub mutation_strength: f64,
    pub blx_alpha: f64,
    pub search_depth: u32,
    pub candidate_cap: usize,
    /// Turn limit of a training game; reaching it is a draw.
    pub max_turns: u32,
    /// Games played per invocation.
    pub batch_budget: usize,
    /// Generation summaries kept in the state.
    pub history_limit: usize,
    pub seed: u64,
    pub init: InitStrategy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 8,
            games_per_matchup: 2,
            generations: 20,
            elite_count: 2,
            tournament_size: 3,
            mutation_rate: 0.2,
            mutation_strength: 0.1,
            blx_alpha: 0.3,
            search_depth: 1,
            candidate_cap: 6,
            max_turns: 300,
            batch_budget: 4,
            history_limit: 100,
            seed: 0,
            init: InitStrategy::Defaults,
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn evolver(&self) -> PopulationEvolver {
        PopulationEvolver {
            elite_count: self.elite_count,
            tournament_size: self.tournament_size,
            blx_alpha: self.blx_alpha,
            mutation_rate: self.mutation_rate,
            mutation_strength: self.mutation_strength,
        }
    }

    /// Both sides of a training game search alike, without randomness.
    #[must_use]
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            depth: self.search_depth.max(1),
            candidate_cap: self.candidate_cap.max(1),
            randomness: 0.0,
        }
    }

    #[must_use]
    pub fn games_per_matchup(&self) -> u32 {
        self.games_per_matchup.max(1)
    }

    #[must_use]
    pub fn games_per_generation(&self) -> u32 {
        let pairs = u32::try_from(matchup_schedule(self.population_size).len()).unwrap_or(u32::MAX);
        pairs.saturating_mul(self.games_per_matchup())
    }
}

/// Best individual of a finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub cycle: u32,
    pub generation: u32,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub best_genome: Genome,
    pub completed_at: DateTime<Utc>,
}

/// Best genome found so far, persisted separately from the state so players
/// can pick it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestGenomeRecord {
    pub genome: Genome,
    pub fitness: f64,
    pub cycle: u32,
    pub generation: u32,
    pub updated_at: DateTime<Utc>,
}

/// Why a persisted state cannot be resumed with the current config.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ShapeError {
    #[display("population has {actual} individuals, expected {expected}")]
    PopulationSize { expected: usize, actual: usize },
    #[display("matchup schedule does not cover the population")]
    Schedule,
    #[display("matchup position {matchup_index}/{game_within_matchup} is out of range")]
    MatchupPosition {
        matchup_index: usize,
        game_within_matchup: u32,
    },
    #[display("generation {generation} is past the cycle length {generations}")]
    Generation { generation: u32, generations: u32 },
    #[display("genome of individual {_0} is out of bounds")]
    GenomeOutOfBounds(#[error(not(source))] usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingState {
    pub config: TrainingConfig,
    pub cycle: u32,
    pub current_generation: u32,
    pub population: Population,
    pub best_genome: Option<BestGenomeRecord>,
    pub generation_history: Vec<GenerationSummary>,
    pub matchup_schedule: Vec<(usize, usize)>,
    pub matchup_index: usize,
    pub game_within_matchup: u32,
    pub games_completed_in_generation: u32,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub insights: SharedInsights,
    pub rng: Pcg32,
}

impl TrainingState {
    /// A fresh state: first generation of the first cycle, nothing played.
    #[must_use]
    pub fn new(config: TrainingConfig, now: DateTime<Utc>) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed);
        let population = Population::init(
            config.init,
            config.population_size,
            &config.evolver(),
            &mut rng,
        );
        let matchup_schedule = matchup_schedule(config.population_size);
        Self {
            config,
            cycle: 0,
            current_generation: 0,
            population,
            best_genome: None,
            generation_history: vec![],
            matchup_schedule,
            matchup_index: 0,
            game_within_matchup: 0,
            games_completed_in_generation: 0,
            last_updated: Some(now),
            insights: SharedInsights::default(),
            rng,
        }
    }

    #[must_use]
    pub fn best_fitness(&self) -> Option<f64> {
        self.best_genome.as_ref().map(|best| best.fitness)
    }

    /// Returns `true` once every matchup of the generation has been played.
    #[must_use]
    pub fn is_generation_complete(&self) -> bool {
        self.matchup_index >= self.matchup_schedule.len()
    }

    /// Checks that this state can be continued under `config`.
    pub fn validate(&self, config: &TrainingConfig) -> Result<(), ShapeError> {
        if self.population.len() != config.population_size {
            return Err(ShapeError::PopulationSize {
                expected: config.population_size,
                actual: self.population.len(),
            });
        }
        if self.matchup_schedule != matchup_schedule(config.population_size) {
            return Err(ShapeError::Schedule);
        }
        if self.matchup_index > self.matchup_schedule.len()
            || self.game_within_matchup >= config.games_per_matchup()
        {
            return Err(ShapeError::MatchupPosition {
                matchup_index: self.matchup_index,
                game_within_matchup: self.game_within_matchup,
            });
        }
        if self.current_generation >= config.generations.max(1) {
            return Err(ShapeError::Generation {
                generation: self.current_generation,
                generations: config.generations,
            });
        }
        if let Some(i) = self
            .population
            .individuals()
            .iter()
            .position(|ind| !ind.genome.is_within_bounds())
        {
            return Err(ShapeError::GenomeOutOfBounds(i));
        }
        Ok(())
    }

    /// Validates the state and switches it to `config`.
    pub fn resume(mut self, config: &TrainingConfig) -> Result<Self, ShapeError> {
        self.validate(config)?;
        self.config = config.clone();
        Ok(self)
    }
}
