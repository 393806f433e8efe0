use std::{path::PathBuf, time::Instant};

use sternhalma_engine::{GameState, Move};
use sternhalma_evaluator::{
    cache::EvolvedGenomeCache, difficulty::Difficulty, genome::Genome, match_play,
    search::SearchEngine,
};

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Number of players (2 to 6)
    #[arg(long, default_value_t = 2)]
    players: usize,
    /// AI strength: easy, medium, hard or evolved
    #[arg(long, default_value = "medium")]
    difficulty: Difficulty,
    /// Seed of the AI players' random choices
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many turns
    #[arg(long, default_value_t = 500)]
    max_turns: u32,
    /// Genome to play with (a best genome record or a bare genome)
    #[arg(long)]
    genome: Option<PathBuf>,
    /// Best genome file produced by training, used by the evolved difficulty
    #[arg(long)]
    best: Option<PathBuf>,
    /// Training state whose insights supply the genome when no other is given
    #[arg(long)]
    insights: Option<PathBuf>,
    /// Print the board after every turn
    #[arg(long, default_value_t = false)]
    boards: bool,
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let PlayArg {
        players,
        difficulty,
        seed,
        max_turns,
        genome,
        best,
        insights,
        boards,
    } = arg;

    let state = GameState::standard(*players)?;
    let genome = match genome {
        Some(path) => util::read_genome_file(path)?,
        None => {
            let cache = EvolvedGenomeCache::default();
            let evolved = match best {
                Some(path) => cache.get_or_load(Instant::now(), || {
                    util::read_best_file(path).map(|record| Some(record.genome))
                })?,
                None => None,
            };
            let insights = insights
                .as_ref()
                .map(util::read_state_file)
                .transpose()?
                .map(|state| state.insights);
            difficulty
                .genome_source(evolved)
                .resolve(insights.as_ref())
        }
    };

    let seed = seed.unwrap_or_else(rand::random);
    let mut engines = seeded_engines(*players, *difficulty, genome, seed);

    println!("{players} players, {difficulty} difficulty, seed {seed}");
    println!("{}", state.board());
    let outcome = match_play::play_match(state, &mut engines, *max_turns, |state, player, mv| {
        let turn = state.turn_number();
        match mv {
            Some(mv) => println!("{turn:4} {player}: {}", describe(mv)),
            None => println!("{turn:4} {player}: pass"),
        }
        if *boards {
            println!("{}", state.board());
        }
    })?;

    println!("{}", outcome.state.board());
    match outcome.winner {
        Some(winner) => println!("{winner} wins after {} turns", outcome.turns),
        None => println!("no winner after {} turns", outcome.turns),
    }
    for record in outcome.state.finished_players() {
        println!("  {} finished in {} moves", record.player, record.move_count);
    }
    Ok(())
}

// one engine per seat, seeded `seed`, `seed + 1`, ...
fn seeded_engines(
    players: usize,
    difficulty: Difficulty,
    genome: Genome,
    seed: u64,
) -> Vec<SearchEngine> {
    (0_u64..)
        .take(players)
        .map(|i| SearchEngine::new(difficulty.params(), genome, seed.wrapping_add(i)))
        .collect()
}

fn describe(mv: &Move) -> String {
    if mv.is_jump() {
        let path = mv
            .jump_path()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        format!("{} => {path}", mv.from)
    } else if mv.is_swap() {
        format!("{} <> {}", mv.from, mv.to)
    } else {
        format!("{} -> {}", mv.from, mv.to)
    }
}
