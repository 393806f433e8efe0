//! Fixed-depth paranoid alpha-beta search.
//!
//! The root player maximizes [`relative_score`](crate::position_evaluator::relative_score)
//! and every other player is assumed to minimize it. Depth counts plies, one
//! player turn each. Positions are explored in place with
//! [`GameState::play_turn`] / [`GameState::revert_turn`]; a player without
//! moves passes.
//!
//! At every node the legal moves are ordered by a cheap key (apex distance
//! gained, plus a bonus for entering the goal) with a stable sort, so ties
//! keep move generation order, and only the first `candidate_cap` are
//! searched.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use sternhalma_engine::{GameState, Move, Player, SeatGeometry, UNREACHABLE, cell_index, move_gen};

use crate::{
    genome::Genome,
    position_evaluator::{EvalCache, relative_score},
};

/// Root candidates considered when a move is picked at random.
const RANDOM_TOP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Plies searched below the root (at least 1).
    pub depth: u32,
    /// Moves searched per node after ordering.
    pub candidate_cap: usize,
    /// Probability of picking uniformly among the top root moves instead of
    /// the best one.
    pub randomness: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SearchError {
    #[display("{_0} has no legal move")]
    NoLegalMoves(#[error(not(source))] Player),
    #[display("the game is over")]
    GameOver,
    #[display("the search worker panicked")]
    WorkerPanicked,
}

/// A move chosen by the search together with its backed-up value.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMove {
    pub mv: Move,
    pub value: f64,
}

/// Alpha-beta searcher with its own genome, evaluation cache and RNG.
///
/// The RNG is only consulted when `randomness > 0`; with the same seed the
/// engine makes the same choices every time.
///
/// # Example
///
/// ```
/// use sternhalma_engine::GameState;
/// use sternhalma_evaluator::{difficulty::Difficulty, genome::Genome, search::SearchEngine};
///
/// let state = GameState::standard(2).unwrap();
/// let mut engine = SearchEngine::new(Difficulty::Medium.params(), Genome::default(), 42);
/// let mv = engine.choose_move(&state).unwrap();
/// assert_eq!(
///     state.board().get(mv.from).and_then(|c| c.piece()),
///     Some(state.current_player())
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SearchEngine {
    params: SearchParams,
    genome: Genome,
    cache: Arc<EvalCache>,
    rng: Pcg32,
}

impl SearchEngine {
    #[must_use]
    pub fn new(params: SearchParams, genome: Genome, seed: u64) -> Self {
        Self::with_rng(params, genome, Pcg32::seed_from_u64(seed))
    }

    #[must_use]
    pub fn with_rng(params: SearchParams, genome: Genome, rng: Pcg32) -> Self {
        Self {
            params,
            genome,
            cache: Arc::new(EvalCache::default()),
            rng,
        }
    }

    /// Replaces the evaluation cache, e.g. to share one between engines
    /// using the same genome.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<EvalCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn params(&self) -> SearchParams {
        self.params
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// An independent engine with the same settings, seeded from this
    /// engine's RNG.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        Self {
            params: self.params,
            genome: self.genome,
            cache: Arc::clone(&self.cache),
            rng: Pcg32::from_rng(&mut self.rng),
        }
    }

    /// Picks a move for the current player of `state`.
    pub fn choose_move(&mut self, state: &GameState) -> Result<Move, SearchError> {
        self.search(state).map(|scored| scored.mv)
    }

    /// Like [`Self::choose_move`], also returning the value of the move.
    pub fn search(&mut self, state: &GameState) -> Result<ScoredMove, SearchError> {
        if state.is_over() {
            return Err(SearchError::GameOver);
        }
        let root = state.current_player();
        let mut scratch = state.clone();
        let candidates = self.ordered_candidates(&scratch, root);
        if candidates.is_empty() {
            return Err(SearchError::NoLegalMoves(root));
        }

        let randomize = self.params.randomness > 0.0;
        let depth = self.params.depth.max(1) - 1;
        let mut alpha = f64::NEG_INFINITY;
        let mut scored = Vec::with_capacity(candidates.len());
        for mv in candidates {
            let undo = scratch.play_turn(mv.clone());
            // exact values are needed to rank the top moves when randomizing
            let lower = if randomize { f64::NEG_INFINITY } else { alpha };
            let value = self.alpha_beta(&mut scratch, depth, lower, f64::INFINITY, root);
            scratch.revert_turn(undo);
            alpha = alpha.max(value);
            scored.push(ScoredMove { mv, value });
        }

        let best = best_index(&scored);
        if randomize && self.rng.random_bool(self.params.randomness.clamp(0.0, 1.0)) {
            let mut order: Vec<usize> = (0..scored.len()).collect();
            order.sort_by(|&a, &b| scored[b].value.total_cmp(&scored[a].value));
            let top = order.len().min(RANDOM_TOP);
            let pick = order[self.rng.random_range(0..top)];
            return Ok(scored.swap_remove(pick));
        }
        Ok(scored.swap_remove(best))
    }

    fn alpha_beta(
        &self,
        state: &mut GameState,
        depth: u32,
        mut alpha: f64,
        mut beta: f64,
        root: Player,
    ) -> f64 {
        if depth == 0 || state.winner().is_some() || state.is_over() {
            return relative_score(state, root, &self.genome, Some(&self.cache));
        }
        let mover = state.current_player();
        let moves = self.ordered_candidates(state, mover);
        if moves.is_empty() {
            let undo = state.pass_turn();
            let value = self.alpha_beta(state, depth - 1, alpha, beta, root);
            state.revert_turn(undo);
            return value;
        }

        if mover == root {
            let mut best = f64::NEG_INFINITY;
            for mv in moves {
                let undo = state.play_turn(mv);
                let value = self.alpha_beta(state, depth - 1, alpha, beta, root);
                state.revert_turn(undo);
                best = best.max(value);
                alpha = alpha.max(value);
                if alpha >= beta {
                    break;
                }
            }
            best
        } else {
            let mut best = f64::INFINITY;
            for mv in moves {
                let undo = state.play_turn(mv);
                let value = self.alpha_beta(state, depth - 1, alpha, beta, root);
                state.revert_turn(undo);
                best = best.min(value);
                beta = beta.min(value);
                if alpha >= beta {
                    break;
                }
            }
            best
        }
    }

    fn ordered_candidates(&self, state: &GameState, player: Player) -> Vec<Move> {
        let mut moves = move_gen::all_moves(state, player);
        let seat = state.seat(player);
        moves.sort_by_key(|mv| std::cmp::Reverse(ordering_key(seat, mv)));
        moves.truncate(self.params.candidate_cap.max(1));
        moves
    }
}

/// Cheap move ordering key: twice the apex distance gained, plus one when
/// the move enters the goal region.
#[must_use]
pub fn ordering_key(seat: &SeatGeometry, mv: &Move) -> i32 {
    let (Some(from), Some(to)) = (cell_index(mv.from), cell_index(mv.to)) else {
        return i32::MIN;
    };
    let apex = |i| {
        let d = seat.apex_distance(i);
        if d == UNREACHABLE {
            i32::from(seat.max_progress())
        } else {
            i32::from(d)
        }
    };
    let entering = i32::from(!seat.is_goal(from) && seat.is_goal(to));
    2 * (apex(from) - apex(to)) + entering
}

// earliest candidate wins ties
fn best_index(scored: &[ScoredMove]) -> usize {
    let mut best = 0;
    for (i, s) in scored.iter().enumerate().skip(1) {
        if s.value > scored[best].value {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use sternhalma_engine::CubeCoord;

    use super::*;
    use crate::difficulty::Difficulty;

    fn params(depth: u32, cap: usize) -> SearchParams {
        SearchParams {
            depth,
            candidate_cap: cap,
            randomness: 0.0,
        }
    }

    #[test]
    fn test_depth_one_is_argmax_of_evaluation() {
        let genome = Genome::default();
        let mut state = GameState::standard(2).unwrap();
        // a few opening moves to get away from the symmetric start
        let _ = state.play_turn(Move::step(CubeCoord::new(5, -1, -4), CubeCoord::new(4, -1, -3)));
        let _ = state.play_turn(Move::step(CubeCoord::new(-5, 1, 4), CubeCoord::new(-4, 1, 3)));

        let player = state.current_player();
        let all = move_gen::all_moves(&state, player);
        let mut best = f64::NEG_INFINITY;
        for mv in &all {
            let undo = state.play_turn(mv.clone());
            best = best.max(relative_score(&state, player, &genome, None));
            state.revert_turn(undo);
        }

        let mut engine = SearchEngine::new(params(1, all.len()), genome, 0);
        let chosen = engine.search(&state).unwrap();
        assert!(all.contains(&chosen.mv));
        assert!((chosen.value - best).abs() < 1e-9);
    }

    #[test]
    fn test_search_is_deterministic() {
        let state = GameState::standard(3).unwrap();
        for difficulty in [Difficulty::Easy, Difficulty::Medium] {
            let params = difficulty.params();
            let a = SearchEngine::new(params, Genome::default(), 7).choose_move(&state);
            let b = SearchEngine::new(params, Genome::default(), 7).choose_move(&state);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_candidate_ordering_is_stable() {
        let state = GameState::standard(2).unwrap();
        let engine = SearchEngine::new(params(1, usize::MAX), Genome::default(), 0);
        let ordered = engine.ordered_candidates(&state, Player(0));
        let seat = state.seat(Player(0));
        let keys: Vec<_> = ordered.iter().map(|m| ordering_key(seat, m)).collect();
        assert!(keys.is_sorted_by(|a, b| a >= b));
        // moves with equal keys keep generation order
        let generated = move_gen::all_moves(&state, Player(0));
        for pair in ordered.windows(2) {
            if ordering_key(seat, &pair[0]) == ordering_key(seat, &pair[1]) {
                let i = generated.iter().position(|m| *m == pair[0]).unwrap();
                let j = generated.iter().position(|m| *m == pair[1]).unwrap();
                assert!(i < j);
            }
        }

        let capped = SearchEngine::new(params(1, 3), Genome::default(), 0);
        assert_eq!(capped.ordered_candidates(&state, Player(0)).len(), 3);
    }

    #[test]
    fn test_prefers_progress() {
        let state = GameState::standard(2).unwrap();
        let mut engine = SearchEngine::new(Difficulty::Medium.params(), Genome::default(), 1);
        let mv = engine.choose_move(&state).unwrap();
        let seat = state.seat(Player(0));
        assert!(ordering_key(seat, &mv) > 0, "{mv:?}");
    }

    #[test]
    fn test_no_moves_is_an_error() {
        use std::sync::Arc;

        use sternhalma_engine::{Layout, RuleSet, Seat};

        let standard = Layout::standard(2).unwrap();
        let seats = vec![
            Seat {
                home: vec![CubeCoord::axial(8, -4)],
                goal: standard.seat(Player(0)).goal().to_vec(),
            },
            Seat {
                home: vec![
                    CubeCoord::axial(7, -3),
                    CubeCoord::axial(7, -4),
                    CubeCoord::axial(6, -2),
                    CubeCoord::axial(6, -4),
                ],
                goal: standard.seat(Player(1)).goal().to_vec(),
            },
        ];
        let state = GameState::new(
            Arc::new(Layout::custom(seats, vec![]).unwrap()),
            RuleSet::default(),
        );
        let mut engine = SearchEngine::new(params(2, 8), Genome::default(), 0);
        assert_eq!(
            engine.choose_move(&state),
            Err(SearchError::NoLegalMoves(Player(0)))
        );
    }

    #[test]
    fn test_fork_is_reproducible() {
        let mut a = SearchEngine::new(Difficulty::Easy.params(), Genome::default(), 99);
        let mut b = SearchEngine::new(Difficulty::Easy.params(), Genome::default(), 99);
        let state = GameState::standard(2).unwrap();
        let fa = a.fork().choose_move(&state);
        let fb = b.fork().choose_move(&state);
        assert_eq!(fa, fb);
    }
}
