use std::{path::PathBuf, thread, time::Duration};

use chrono::Utc;
use sternhalma_training::{scheduler::TrainingScheduler, state::TrainingConfig};
use tracing::{info, warn};

use crate::{store::JsonFileStore, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Training state file (created on the first run)
    #[arg(long)]
    state: PathBuf,
    /// Best genome file
    #[arg(long)]
    best: PathBuf,
    /// Training config file (JSON); missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Games per invocation, overriding the config
    #[arg(long)]
    batch: Option<usize>,
    /// Seed of a fresh training state, overriding the config
    #[arg(long)]
    seed: Option<u64>,
    /// Keep invoking the trainer instead of running a single batch
    #[arg(long = "loop", default_value_t = false)]
    repeat: bool,
    /// Pause between invocations when looping
    #[arg(long, default_value_t = 60)]
    interval_secs: u64,
    /// Stop looping after this many invocations
    #[arg(long)]
    max_invocations: Option<usize>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        state,
        best,
        config,
        batch,
        seed,
        repeat,
        interval_secs,
        max_invocations,
    } = arg;

    let mut config = match config {
        Some(path) => util::read_config_file(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(batch) = batch {
        config.batch_budget = *batch;
    }
    if let Some(seed) = seed {
        config.seed = *seed;
    }

    let scheduler = TrainingScheduler::new(config);
    let mut store = JsonFileStore::new(state.clone(), best.clone());
    let mut invocations = 0;
    loop {
        invocations += 1;
        match scheduler.invoke(&mut store, Utc::now()) {
            Ok(telemetry) => {
                if let Some(summary) = &telemetry.generation_completed {
                    info!(
                        cycle = summary.cycle,
                        generation = summary.generation,
                        best_fitness = summary.best_fitness,
                        avg_fitness = summary.avg_fitness,
                        new_best = telemetry.new_best,
                        "generation summary"
                    );
                }
                info!(
                    games = telemetry.games_played,
                    decisive = telemetry.decisive_games,
                    turns = telemetry.turns_played,
                    "batch finished"
                );
            }
            // a looping trainer retries the same batch next time
            Err(err) if *repeat => warn!(%err, "training batch failed"),
            Err(err) => return Err(err.into()),
        }

        if !*repeat || max_invocations.is_some_and(|max| invocations >= max) {
            break;
        }
        thread::sleep(Duration::from_secs(*interval_secs));
    }
    Ok(())
}
