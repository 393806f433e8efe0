//! Aggregates learned from finished games.
//!
//! Every recorded game contributes the winner's genome to a running average
//! per [`GenomeField`], plus two descriptive figures: how many turns the
//! winner needed after its first piece reached the goal, and in which turn
//! (counted per player) each goal depth tends to get filled.

use serde::{Deserialize, Serialize};
use sternhalma_engine::{CubeCoord, GameState, HistoryEntry, Player, cell_index};
use sternhalma_stats::running::RunningAverage;

use crate::genome::{Genome, GenomeField};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SharedInsights {
    games: u64,
    weights: Vec<RunningAverage>,
    endgame_turns: RunningAverage,
    /// Indexed by apex distance of the goal cell.
    fill_order: Vec<RunningAverage>,
}

impl SharedInsights {
    #[must_use]
    pub fn games(&self) -> u64 {
        self.games
    }

    /// Records a finished game won with `genome`.
    ///
    /// Returns `false`, recording nothing, when the game has no winner.
    pub fn record_game(&mut self, genome: &Genome, state: &GameState) -> bool {
        let Some(winner) = state.winner() else {
            return false;
        };
        self.games += 1;
        if self.weights.len() != GenomeField::LEN {
            self.weights = vec![RunningAverage::default(); GenomeField::LEN];
        }
        for field in GenomeField::ALL {
            self.weights[field.index()].push(genome.get(field));
        }

        let seat = state.seat(winner);
        let in_goal = |c: CubeCoord| cell_index(c).is_some_and(|i| seat.is_goal(i));
        let turns = player_turns(state.move_history(), winner);
        if let Some(first) = turns.iter().position(|&(_, to)| in_goal(to)) {
            self.endgame_turns.push(count(turns.len() - first));
        }
        for (k, &(from, to)) in turns.iter().enumerate() {
            if in_goal(from) || !in_goal(to) {
                continue;
            }
            let Some(depth) = cell_index(to).map(|i| usize::from(seat.apex_distance(i))) else {
                continue;
            };
            if self.fill_order.len() <= depth {
                self.fill_order.resize(depth + 1, RunningAverage::default());
            }
            self.fill_order[depth].push(count(k));
        }
        true
    }

    /// Average genome of recorded winners, falling back to the hand-tuned
    /// value for fields without samples.
    #[must_use]
    pub fn default_genome(&self) -> Genome {
        Genome::from_fn(|field| {
            self.weights
                .get(field.index())
                .and_then(RunningAverage::get)
                .map_or_else(|| field.default_value(), |v| field.clamp(v))
        })
    }

    /// Mean number of turns a winner plays after first reaching the goal.
    #[must_use]
    pub fn endgame_turns(&self) -> Option<f64> {
        self.endgame_turns.get()
    }

    /// Mean turn index at which a piece settles at each goal depth
    /// (0 is the apex).
    #[must_use]
    pub fn fill_order(&self) -> Vec<Option<f64>> {
        self.fill_order.iter().map(RunningAverage::get).collect()
    }
}

fn count(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}

// (start, end) of each turn `player` took
fn player_turns(history: &[HistoryEntry], player: Player) -> Vec<(CubeCoord, CubeCoord)> {
    let mut turns: Vec<(u32, CubeCoord, CubeCoord)> = vec![];
    for entry in history.iter().filter(|e| e.player == player) {
        match turns.last_mut() {
            Some((turn, _, to)) if *turn == entry.turn_number => *to = entry.mv.to,
            _ => turns.push((entry.turn_number, entry.mv.from, entry.mv.to)),
        }
    }
    turns.into_iter().map(|(_, from, to)| (from, to)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sternhalma_engine::{Layout, Move, RuleSet, Seat};

    use super::*;

    fn c(q: i32, r: i32) -> CubeCoord {
        CubeCoord::axial(q, r)
    }

    fn one_step_from_winning() -> GameState {
        let standard = Layout::standard(2).unwrap();
        let seats = vec![
            Seat {
                home: vec![c(-4, 2)],
                goal: standard.seat(Player(0)).goal().to_vec(),
            },
            Seat {
                home: vec![c(4, -2)],
                goal: standard.seat(Player(1)).goal().to_vec(),
            },
        ];
        GameState::new(
            Arc::new(Layout::custom(seats, vec![]).unwrap()),
            RuleSet::default(),
        )
    }

    #[test]
    fn test_unfinished_game_is_ignored() {
        let mut insights = SharedInsights::default();
        let state = GameState::standard(2).unwrap();
        assert!(!insights.record_game(&Genome::default(), &state));
        assert_eq!(insights.games(), 0);
        assert_eq!(insights.default_genome(), Genome::default());
    }

    #[test]
    fn test_record_winning_game() {
        let mut state = one_step_from_winning();
        let _ = state.play_turn(Move::step(c(-4, 2), c(-5, 2)));
        assert_eq!(state.winner(), Some(Player(0)));

        let mut insights = SharedInsights::default();
        let genome = Genome {
            progress: 2.0,
            ..Genome::default()
        };
        assert!(insights.record_game(&genome, &state));
        assert_eq!(insights.games(), 1);
        assert_eq!(insights.default_genome(), genome);
        assert_eq!(insights.endgame_turns(), Some(1.0));

        // (-5,2) is three cells from the apex at (-8,4)
        let fill = insights.fill_order();
        assert_eq!(fill.len(), 4);
        assert_eq!(fill[3], Some(0.0));
        assert_eq!(fill[0], None);
    }

    #[test]
    fn test_default_genome_averages_winners() {
        let mut state = one_step_from_winning();
        let _ = state.play_turn(Move::step(c(-4, 2), c(-5, 2)));
        let mut insights = SharedInsights::default();
        for progress in [1.0, 2.0] {
            let genome = Genome {
                progress,
                ..Genome::default()
            };
            insights.record_game(&genome, &state);
        }
        assert!((insights.default_genome().progress - 1.5).abs() < 1e-12);

        let json = serde_json::to_string(&insights).unwrap();
        let back: SharedInsights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, insights);
    }
}
