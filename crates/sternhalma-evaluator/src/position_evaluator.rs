//! Genome-weighted scoring of game positions.
//!
//! For a player with `n` pieces, `apex(c)` / `goal(c)` the step distances of
//! a cell to the goal apex / goal region, `P` the largest apex distance among
//! the home cells and `D` the deepest goal cell:
//!
//! ```text
//! progress = Σ (P - apex(p)) / n
//! goal     = -(Σ goal(p) / n + straggler² / straggler_divisor)
//! center   = center_piece_value · Σ min(1, (P - apex(p)) / (P - apex(0,0))) / n
//! blocking = blocking_base_value · #blockers / n
//! jump     = min(jump_potential_multiplier · Σ best jump gain, jump_potential_cap)
//! fill     = Σ_{p in goal} (D + 1 - apex(p)) / n           (endgame only)
//!
//! score = progress·w_progress + goal·w_goal + center·w_center + blocking·w_blocking
//!       + jump·w_jump + fill·w_goal + WIN_BONUS (if finished) - penalties
//! ```
//!
//! The center term credits each piece for the share of the way to the middle
//! of the board it has covered, and keeps full credit once past it, so that
//! no term rewards holding a piece back. Once the number of pieces in the
//! goal reaches `endgame_threshold`, the blocking term is dropped and goal
//! filling order counts instead. Penalties look at the player's most recent turn: moving away from
//! the apex, leaving the goal, undoing the previous turn, or returning to a
//! cell left within the last four turns.
//!
//! Search compares positions with [`relative_score`]: the player's score
//! minus the best opponent score. Only the relative ordering of positions
//! matters, not the magnitude.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use sternhalma_engine::{
    Board, CellContent, CellIndex, CubeCoord, GameState, HistoryEntry, Player, SeatGeometry,
    UNREACHABLE, cell_index, move_gen, neighbor_indices,
};

use crate::genome::Genome;

/// Score bonus for a player whose pieces all sit in the goal region.
pub const WIN_BONUS: f64 = 1000.0;

/// Own turns looked at by the cycle penalty, not counting the latest one.
const CYCLE_WINDOW: usize = 4;

/// Scores positions from the point of view of one player (higher is better).
pub trait PositionEvaluator: fmt::Debug + Send + Sync {
    fn evaluate(&self, state: &GameState, perspective: Player) -> f64;
}

/// Individual terms of a player's score, before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreTerms {
    pub progress: f64,
    pub goal: f64,
    pub center: f64,
    pub blocking: f64,
    pub jump: f64,
    pub fill: f64,
    pub pieces_in_goal: usize,
    pub endgame: bool,
    pub finished: bool,
}

impl ScoreTerms {
    /// Weighted sum of the terms, including the win bonus.
    #[must_use]
    pub fn weighted(&self, genome: &Genome) -> f64 {
        let bonus = if self.finished { WIN_BONUS } else { 0.0 };
        self.progress * genome.progress
            + self.goal * genome.goal_distance
            + self.center * genome.center_control
            + self.blocking * genome.blocking
            + self.jump * genome.jump_potential
            + self.fill * genome.goal_distance
            + bonus
    }
}

/// History-independent terms of `player`'s score.
///
/// Only the board, the layout and the rules of `state` are used.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn score_terms(state: &GameState, player: Player, genome: &Genome) -> ScoreTerms {
    let board = state.board();
    let seat = state.seat(player);
    let pieces: Vec<_> = board.pieces_of(player).collect();
    if pieces.is_empty() {
        return ScoreTerms::default();
    }
    let n = pieces.len() as f64;
    let max_progress = f64::from(seat.max_progress());
    let apex = |i| distance_or(seat.apex_distance(i), max_progress);
    let goal = |i| distance_or(seat.goal_distance(i), max_progress);

    let progress = pieces.iter().map(|&i| max_progress - apex(i)).sum::<f64>() / n;
    let straggler = pieces.iter().map(|&i| goal(i)).fold(0.0, f64::max);
    let goal_term = -(pieces.iter().map(|&i| goal(i)).sum::<f64>() / n
        + straggler * straggler / genome.straggler_divisor.max(1.0));

    let pieces_in_goal = pieces.iter().filter(|&&i| seat.is_goal(i)).count();
    let endgame = pieces_in_goal as f64 >= genome.endgame_threshold;

    // share of the way from the home tip to the board's center, full once
    // the piece has passed the center
    let center_depth = cell_index(CubeCoord::axial(0, 0)).map_or(0.0, apex);
    let center_span = max_progress - center_depth;
    let center = genome.center_piece_value
        * pieces
            .iter()
            .map(|&i| {
                if center_span <= 0.0 {
                    1.0
                } else {
                    ((max_progress - apex(i)) / center_span).clamp(0.0, 1.0)
                }
            })
            .sum::<f64>()
        / n;

    let (blocking, fill) = if endgame {
        let depth = f64::from(seat.max_goal_depth());
        let fill = pieces
            .iter()
            .filter(|&&i| seat.is_goal(i))
            .map(|&i| depth + 1.0 - apex(i))
            .sum::<f64>()
            / n;
        (0.0, fill)
    } else {
        let blockers = pieces
            .iter()
            .filter(|&&i| is_blocking(state, player, i))
            .count();
        (genome.blocking_base_value * blockers as f64 / n, 0.0)
    };

    let rules = state.rules();
    let jump_gain = pieces
        .iter()
        .map(|&i| {
            move_gen::moves_for_piece(board, seat, rules, i, player)
                .iter()
                .filter(|m| m.is_jump())
                .filter_map(|m| cell_index(m.to))
                .map(|to| apex(i) - apex(to))
                .fold(0.0, f64::max)
        })
        .sum::<f64>();
    let jump = (genome.jump_potential_multiplier * jump_gain).min(genome.jump_potential_cap);

    ScoreTerms {
        progress,
        goal: goal_term,
        center,
        blocking,
        jump,
        fill,
        pieces_in_goal,
        endgame,
        finished: pieces_in_goal == pieces.len(),
    }
}

fn distance_or(d: u8, fallback: f64) -> f64 {
    if d == UNREACHABLE {
        fallback
    } else {
        f64::from(d)
    }
}

// a piece blocks an adjacent opponent piece when it stands closer to that
// opponent's apex than the opponent piece does
fn is_blocking(state: &GameState, player: Player, at: CellIndex) -> bool {
    let board = state.board();
    neighbor_indices(at).into_iter().any(|n| match board.at(n) {
        CellContent::Piece(other) if other != player => {
            let seat = state.seat(other);
            seat.apex_distance(at) < seat.apex_distance(n)
        }
        CellContent::Piece(_) | CellContent::Empty | CellContent::Wall => false,
    })
}

/// Penalties for `player`'s most recent turn.
#[must_use]
pub fn move_penalties(state: &GameState, player: Player, genome: &Genome) -> f64 {
    let turns = recent_turns(state.move_history(), player, CYCLE_WINDOW + 1);
    let Some(&(from, to)) = turns.first() else {
        return 0.0;
    };
    let seat = state.seat(player);
    let mut penalty = 0.0;

    let (Some(fi), Some(ti)) = (cell_index(from), cell_index(to)) else {
        return 0.0;
    };
    let before = apex_distance(seat, fi);
    let after = apex_distance(seat, ti);
    if after > before {
        penalty += genome.regression_multiplier * f64::from(after - before);
    }
    if seat.is_goal(fi) && !seat.is_goal(ti) {
        penalty += genome.goal_leave_penalty;
    }
    if let Some(&(prev_from, prev_to)) = turns.get(1)
        && from == prev_to
        && to == prev_from
    {
        penalty += genome.repetition_penalty;
    }
    if turns[1..].iter().any(|&(origin, _)| origin == to) {
        penalty += genome.cycle_penalty;
    }
    penalty
}

fn apex_distance(seat: &SeatGeometry, i: CellIndex) -> i32 {
    let d = seat.apex_distance(i);
    if d == UNREACHABLE {
        i32::from(seat.max_progress())
    } else {
        i32::from(d)
    }
}

/// `(start, end)` of `player`'s latest turns, newest first. A turn made of
/// several chained moves collapses into one pair.
fn recent_turns(
    history: &[HistoryEntry],
    player: Player,
    limit: usize,
) -> Vec<(CubeCoord, CubeCoord)> {
    let mut turns: Vec<(u32, CubeCoord, CubeCoord)> = vec![];
    for h in history.iter().rev().filter(|h| h.player == player) {
        match turns.last_mut() {
            Some((turn, from, _)) if *turn == h.turn_number => *from = h.mv.from,
            _ => {
                if turns.len() == limit {
                    break;
                }
                turns.push((h.turn_number, h.mv.from, h.mv.to));
            }
        }
    }
    turns.into_iter().map(|(_, from, to)| (from, to)).collect()
}

/// Full score of `player`: weighted terms minus move penalties.
///
/// # Example
///
/// ```
/// use sternhalma_engine::{GameState, Player};
/// use sternhalma_evaluator::{genome::Genome, position_evaluator};
///
/// let state = GameState::standard(2).unwrap();
/// let genome = Genome::default();
/// let a = position_evaluator::score(&state, Player(0), &genome);
/// let b = position_evaluator::score(&state, Player(1), &genome);
/// // the starting position is symmetric
/// assert!((a - b).abs() < 1e-9);
/// ```
#[must_use]
pub fn score(state: &GameState, player: Player, genome: &Genome) -> f64 {
    score_terms(state, player, genome).weighted(genome) - move_penalties(state, player, genome)
}

/// `perspective`'s score minus the best score among the other active players.
#[must_use]
pub fn relative_score(
    state: &GameState,
    perspective: Player,
    genome: &Genome,
    cache: Option<&EvalCache>,
) -> f64 {
    let static_part = |p: Player| match cache {
        Some(cache) => cache.get_or_insert_with(state.board(), p, || {
            score_terms(state, p, genome).weighted(genome)
        }),
        None => score_terms(state, p, genome).weighted(genome),
    };
    let full = |p: Player| static_part(p) - move_penalties(state, p, genome);
    let best_opponent = state
        .active_players()
        .iter()
        .filter(|&&p| p != perspective)
        .map(|&p| full(p))
        .reduce(f64::max);
    full(perspective) - best_opponent.unwrap_or(0.0)
}

/// Memoized history-independent scores keyed by `(board, player)`.
///
/// A cache is only valid for a single genome and layout; callers own it
/// and clear it when either changes. When full it is emptied wholesale.
#[derive(Debug)]
pub struct EvalCache {
    capacity: usize,
    entries: Mutex<HashMap<(Board, Player), f64>>,
}

impl Default for EvalCache {
    fn default() -> Self {
        Self::with_capacity(EvalCache::DEFAULT_CAPACITY)
    }
}

impl EvalCache {
    pub const DEFAULT_CAPACITY: usize = 200_000;

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_insert_with<F>(&self, board: &Board, player: Player, f: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let key = (*board, player);
        if let Some(&v) = self.lock().get(&key) {
            return v;
        }
        let value = f();
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.clear();
        }
        entries.insert(key, value);
        value
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Board, Player), f64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`PositionEvaluator`] backed by a genome and an optional shared cache.
#[derive(Debug, Clone)]
pub struct GenomeEvaluator {
    genome: Genome,
    cache: Option<Arc<EvalCache>>,
}

impl GenomeEvaluator {
    #[must_use]
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(genome: Genome, cache: Arc<EvalCache>) -> Self {
        Self {
            genome,
            cache: Some(cache),
        }
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }
}

impl PositionEvaluator for GenomeEvaluator {
    fn evaluate(&self, state: &GameState, perspective: Player) -> f64 {
        relative_score(state, perspective, &self.genome, self.cache.as_deref())
    }
}
