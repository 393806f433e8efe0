//! Resumable training in bounded batches.
//!
//! [`step`] plays at most `budget` games of the current generation, starting
//! at the persisted matchup position, and finishes the generation when its
//! last game has been played. The games of a batch are split over at most
//! one thread per available core, but their results are applied in schedule
//! order, so a step is deterministic.
//!
//! [`TrainingScheduler::invoke`] wraps one step in load and save. Progress
//! only counts once it has been saved: if a save fails, the next invocation
//! starts from the previous record and plays the same games again instead of
//! counting them twice.

use std::{num::NonZeroUsize, panic, thread};

use chrono::{DateTime, Utc};
use sternhalma_evaluator::{
    genome::Genome,
    match_play::{self, MatchError, MatchOutcome},
    search::{SearchEngine, SearchParams},
};
use tracing::{info, warn};

use crate::{
    schedule::seat_order,
    state::{BestGenomeRecord, GenerationSummary, TrainingConfig, TrainingState},
    store::{StoreError, TrainingStore},
};

const WIN_FITNESS: f64 = 3.0;
const DRAW_FITNESS: f64 = 1.0;

/// What a step did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepTelemetry {
    pub games_played: usize,
    /// Games that ended with a winner before the turn limit.
    pub decisive_games: usize,
    pub turns_played: u64,
    pub generation_completed: Option<GenerationSummary>,
    pub new_best: bool,
    pub cycle_completed: bool,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledGame {
    seats: [usize; 2],
}

/// Plays up to `budget` games of the current generation.
///
/// On error the state is left untouched.
pub fn step(
    state: &mut TrainingState,
    budget: usize,
    now: DateTime<Utc>,
) -> Result<StepTelemetry, MatchError> {
    let games = next_games(state, budget);
    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    let outcomes = play_games(state, &games, workers)?;

    let mut telemetry = StepTelemetry::default();
    for (game, outcome) in games.iter().zip(&outcomes) {
        apply_result(state, *game, outcome, &mut telemetry);
    }
    if state.is_generation_complete() {
        finish_generation(state, now, &mut telemetry);
    }
    state.last_updated = Some(now);
    Ok(telemetry)
}

fn next_games(state: &TrainingState, budget: usize) -> Vec<ScheduledGame> {
    let per_matchup = state.config.games_per_matchup();
    let mut games = vec![];
    let mut matchup = state.matchup_index;
    let mut game = state.game_within_matchup;
    while games.len() < budget && matchup < state.matchup_schedule.len() {
        games.push(ScheduledGame {
            seats: seat_order(state.matchup_schedule[matchup], game),
        });
        game += 1;
        if game >= per_matchup {
            matchup += 1;
            game = 0;
        }
    }
    games
}

/// Plays `games` on at most `workers` threads, each taking a contiguous run
/// of the schedule. Outcomes come back in schedule order.
fn play_games(
    state: &TrainingState,
    games: &[ScheduledGame],
    workers: usize,
) -> Result<Vec<MatchOutcome>, MatchError> {
    if games.is_empty() {
        return Ok(vec![]);
    }
    let params = state.config.search_params();
    let max_turns = state.config.max_turns;
    let individuals = state.population.individuals();
    let chunk_size = games.len().div_ceil(workers.max(1));
    thread::scope(|s| {
        let handles: Vec<_> = games
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|game| {
                            let genomes = game.seats.map(|i| individuals[i].genome);
                            play_game(genomes, params, max_turns)
                        })
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();
        let mut outcomes = Vec::with_capacity(games.len());
        for handle in handles {
            outcomes.extend(handle.join().unwrap_or_else(|err| panic::resume_unwind(err))?);
        }
        Ok(outcomes)
    })
}

fn play_game(
    genomes: [Genome; 2],
    params: SearchParams,
    max_turns: u32,
) -> Result<MatchOutcome, MatchError> {
    let mut engines = genomes.map(|genome| SearchEngine::new(params, genome, 0));
    match_play::play_standard(&mut engines, max_turns)
}

fn apply_result(
    state: &mut TrainingState,
    game: ScheduledGame,
    outcome: &MatchOutcome,
    telemetry: &mut StepTelemetry,
) {
    let individuals = state.population.individuals_mut();
    for i in game.seats {
        individuals[i].games_played += 1;
    }
    match outcome.winner {
        Some(player) => {
            let winner = &mut individuals[game.seats[player.index()]];
            winner.fitness += WIN_FITNESS;
            winner.wins += 1;
            let genome = winner.genome;
            state.insights.record_game(&genome, &outcome.state);
            telemetry.decisive_games += 1;
        }
        None => {
            for i in game.seats {
                individuals[i].fitness += DRAW_FITNESS;
            }
        }
    }
    telemetry.games_played += 1;
    telemetry.turns_played += u64::from(outcome.turns);

    state.games_completed_in_generation += 1;
    state.game_within_matchup += 1;
    if state.game_within_matchup >= state.config.games_per_matchup() {
        state.matchup_index += 1;
        state.game_within_matchup = 0;
    }
}

fn finish_generation(
    state: &mut TrainingState,
    now: DateTime<Utc>,
    telemetry: &mut StepTelemetry,
) {
    if let Some(best) = state.population.best() {
        let avg_fitness = state
            .population
            .fitness_stats()
            .map_or(best.fitness, |stats| stats.mean);
        let summary = GenerationSummary {
            cycle: state.cycle,
            generation: state.current_generation,
            best_fitness: best.fitness,
            avg_fitness,
            best_genome: best.genome,
            completed_at: now,
        };
        info!(
            cycle = summary.cycle,
            generation = summary.generation,
            best_fitness = summary.best_fitness,
            avg_fitness = summary.avg_fitness,
            "generation complete"
        );
        if state.best_fitness().is_none_or(|f| summary.best_fitness > f) {
            state.best_genome = Some(BestGenomeRecord {
                genome: summary.best_genome,
                fitness: summary.best_fitness,
                cycle: summary.cycle,
                generation: summary.generation,
                updated_at: now,
            });
            telemetry.new_best = true;
        }
        state.generation_history.push(summary.clone());
        let excess = state
            .generation_history
            .len()
            .saturating_sub(state.config.history_limit);
        state.generation_history.drain(..excess);
        telemetry.generation_completed = Some(summary);
    }

    state.population = state.config.evolver().evolve(&state.population, &mut state.rng);
    state.matchup_index = 0;
    state.game_within_matchup = 0;
    state.games_completed_in_generation = 0;
    state.current_generation += 1;
    if state.current_generation >= state.config.generations.max(1) {
        state.cycle += 1;
        state.current_generation = 0;
        telemetry.cycle_completed = true;
        info!(cycle = state.cycle, "starting a new training cycle");
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SchedulerError {
    #[display("training store failed: {_0}")]
    Store(StoreError),
    #[display("training game failed: {_0}")]
    Match(MatchError),
}

/// Runs one batch per invocation against a [`TrainingStore`].
#[derive(Debug, Clone)]
pub struct TrainingScheduler {
    config: TrainingConfig,
}

impl TrainingScheduler {
    #[must_use]
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Loads the state (or starts over), plays one batch and saves the best
    /// genome, when it improved, followed by the state.
    pub fn invoke<S>(
        &self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Result<StepTelemetry, SchedulerError>
    where
        S: TrainingStore + ?Sized,
    {
        let mut state = self
            .load_or_init(store, now)
            .map_err(SchedulerError::Store)?;
        let telemetry =
            step(&mut state, self.config.batch_budget, now).map_err(SchedulerError::Match)?;

        if telemetry.new_best
            && let Some(best) = &state.best_genome
        {
            store.save_best(best).map_err(|err| {
                warn!(%err, "failed to save the best genome");
                SchedulerError::Store(err)
            })?;
        }
        store.save_state(&state).map_err(|err| {
            warn!(%err, "failed to save the training state");
            SchedulerError::Store(err)
        })?;

        info!(
            cycle = state.cycle,
            generation = state.current_generation,
            matchup = state.matchup_index,
            games = telemetry.games_played,
            "training batch saved"
        );
        Ok(telemetry)
    }

    fn load_or_init<S>(&self, store: &S, now: DateTime<Utc>) -> Result<TrainingState, StoreError>
    where
        S: TrainingStore + ?Sized,
    {
        let state = match store.load_state() {
            Ok(Some(state)) => match state.resume(&self.config) {
                Ok(state) => return Ok(state),
                Err(err) => {
                    warn!(%err, "persisted training state does not fit the config, starting over");
                    TrainingState::new(self.config.clone(), now)
                }
            },
            Ok(None) => {
                info!("no persisted training state, starting fresh");
                TrainingState::new(self.config.clone(), now)
            }
            Err(StoreError::Format(err)) => {
                warn!(%err, "persisted training state is unreadable, starting over");
                TrainingState::new(self.config.clone(), now)
            }
            Err(err) => return Err(err),
        };
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn config() -> TrainingConfig {
        TrainingConfig {
            population_size: 4,
            games_per_matchup: 2,
            generations: 3,
            max_turns: 12,
            batch_budget: 5,
            ..TrainingConfig::default()
        }
    }

    fn total_games_played(state: &TrainingState) -> u32 {
        state
            .population
            .individuals()
            .iter()
            .map(|ind| ind.games_played)
            .sum()
    }

    #[test]
    fn test_games_keep_schedule_order_for_any_worker_count() {
        let state = TrainingState::new(config(), Utc::now());
        let games = next_games(&state, 7);
        assert_eq!(games.len(), 7);
        let sequential = play_games(&state, &games, 1).unwrap();
        for workers in [2, 3, 7, 64] {
            let parallel = play_games(&state, &games, workers).unwrap();
            assert_eq!(parallel.len(), sequential.len());
            for (a, b) in parallel.iter().zip(&sequential) {
                assert_eq!(a.winner, b.winner);
                assert_eq!(a.turns, b.turns);
                assert_eq!(a.state.board(), b.state.board());
            }
        }
        assert!(play_games(&state, &[], 4).unwrap().is_empty());
    }

    #[test]
    fn test_generation_plays_every_matchup() {
        let now = Utc::now();
        let mut state = TrainingState::new(config(), now);
        let telemetry = step(&mut state, 11, now).unwrap();
        assert_eq!(telemetry.games_played, 11);
        assert_eq!(state.games_completed_in_generation, 11);
        assert_eq!((state.matchup_index, state.game_within_matchup), (5, 1));
        assert_eq!(total_games_played(&state), 22);
        let fitness: f64 = state.population.individuals().iter().map(|ind| ind.fitness).sum();
        let decisive = telemetry.decisive_games as f64;
        assert!((fitness - (3.0 * decisive + 2.0 * (11.0 - decisive))).abs() < 1e-9);

        // the step stops at the end of the generation
        let telemetry = step(&mut state, 100, now).unwrap();
        assert_eq!(telemetry.games_played, 1);
        let summary = telemetry.generation_completed.unwrap();
        assert_eq!((summary.cycle, summary.generation), (0, 0));
        assert!(telemetry.new_best);
        assert_eq!(state.best_fitness(), Some(summary.best_fitness));
        assert_eq!(state.current_generation, 1);
        assert_eq!(state.matchup_index, 0);
        assert_eq!(state.games_completed_in_generation, 0);
        assert_eq!(state.generation_history.len(), 1);
        assert_eq!(state.population.len(), 4);
        assert_eq!(total_games_played(&state), 0);
        assert!(state.validate(&config()).is_ok());
    }

    #[test]
    fn test_resume_mid_generation() {
        let now = Utc::now();
        let mut state = TrainingState::new(config(), now);
        state.matchup_index = 3;
        state.game_within_matchup = 0;
        state.games_completed_in_generation = 5;
        let telemetry = step(&mut state, 1, now).unwrap();
        assert_eq!(telemetry.games_played, 1);
        assert_eq!(state.games_completed_in_generation, 6);
        assert_eq!((state.matchup_index, state.game_within_matchup), (3, 1));
        assert_eq!(state.current_generation, 0);
        // pair (1, 2) played its first game
        let played: Vec<_> = state
            .population
            .individuals()
            .iter()
            .map(|ind| ind.games_played)
            .collect();
        assert_eq!(played, vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_step_is_deterministic() {
        let now = Utc::now();
        let mut a = TrainingState::new(config(), now);
        let mut b = a.clone();
        for budget in [7, 5] {
            step(&mut a, budget, now).unwrap();
        }
        step(&mut b, 12, now).unwrap();
        assert_eq!(a.population, b.population);
        assert_eq!(a.generation_history, b.generation_history);
        assert_eq!(a.rng, b.rng);
    }

    #[test]
    fn test_cycle_restarts_from_evolved_population() {
        let now = Utc::now();
        let single = TrainingConfig {
            generations: 1,
            history_limit: 1,
            ..config()
        };
        let mut state = TrainingState::new(single, now);
        let first = state.population.clone();
        let telemetry = step(&mut state, 12, now).unwrap();
        assert!(telemetry.cycle_completed);
        assert_eq!((state.cycle, state.current_generation), (1, 0));
        assert_ne!(state.population, first);

        step(&mut state, 12, now).unwrap();
        assert_eq!(state.cycle, 2);
        assert_eq!(state.generation_history.len(), 1);
        assert_eq!(state.generation_history[0].cycle, 1);
    }

    #[test]
    fn test_invoke_resumes_from_store() {
        let now = Utc::now();
        let scheduler = TrainingScheduler::new(config());
        let mut store = MemoryStore::new();
        scheduler.invoke(&mut store, now).unwrap();
        let state = store.load_state().unwrap().unwrap();
        assert_eq!(state.games_completed_in_generation, 5);

        scheduler.invoke(&mut store, now).unwrap();
        let state = store.load_state().unwrap().unwrap();
        assert_eq!(state.games_completed_in_generation, 10);
        assert!(store.load_best().unwrap().is_none());

        let telemetry = scheduler.invoke(&mut store, now).unwrap();
        assert_eq!(telemetry.games_played, 2);
        let best = store.load_best().unwrap().unwrap();
        let state = store.load_state().unwrap().unwrap();
        assert_eq!(state.current_generation, 1);
        assert_eq!(Some(best.fitness), state.best_fitness());
    }

    #[test]
    fn test_failed_save_is_not_double_counted() {
        let now = Utc::now();
        let scheduler = TrainingScheduler::new(config());
        let mut store = MemoryStore::new();
        scheduler.invoke(&mut store, now).unwrap();

        store.set_fail_saves(true);
        let err = scheduler.invoke(&mut store, now).unwrap_err();
        assert!(matches!(err, SchedulerError::Store(StoreError::Unavailable(_))));

        store.set_fail_saves(false);
        scheduler.invoke(&mut store, now).unwrap();
        let state = store.load_state().unwrap().unwrap();
        assert_eq!(state.games_completed_in_generation, 10);
        assert_eq!(total_games_played(&state), 20);
    }

    #[test]
    fn test_cold_start_on_mismatch_or_garbage() {
        let now = Utc::now();
        let mut store = MemoryStore::new();
        let other = TrainingConfig {
            population_size: 5,
            ..config()
        };
        TrainingScheduler::new(other).invoke(&mut store, now).unwrap();

        let scheduler = TrainingScheduler::new(config());
        scheduler.invoke(&mut store, now).unwrap();
        let state = store.load_state().unwrap().unwrap();
        assert_eq!(state.population.len(), 4);
        assert_eq!(state.games_completed_in_generation, 5);

        store.set_raw_state("{ not json");
        scheduler.invoke(&mut store, now).unwrap();
        let state = store.load_state().unwrap().unwrap();
        assert_eq!(state.games_completed_in_generation, 5);
    }
}
