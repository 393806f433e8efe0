use crate::{
    core::{Board, CubeCoord, LayoutError, Move, Player},
    engine::{
        move_gen::{self, MoveGenError},
        state::{GameState, StateFingerprint, TurnSummary},
    },
};

/// Where the current player is within their turn.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum SessionPhase {
    /// Nothing selected.
    Idle,
    /// A piece is selected and its legal moves are known.
    Selected {
        piece: CubeCoord,
        candidates: Vec<Move>,
    },
    /// At least one move was applied this turn. `candidates` holds the chain
    /// jumps still available to the moved piece (possibly none).
    Pending {
        piece: CubeCoord,
        candidates: Vec<Move>,
    },
    /// Every active player has finished.
    GameOver,
}

impl SessionPhase {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selected { .. } => "a piece is selected",
            Self::Pending { .. } => "moves are pending confirmation",
            Self::GameOver => "the game is over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum TurnError {
    #[display("the game is over")]
    GameOver,
    #[display("cannot {action} while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },
    #[display("{_0}")]
    Selection(MoveGenError),
    #[display("{_0} is not a legal destination")]
    IllegalDestination(#[error(not(source))] CubeCoord),
    #[display("{_0} still has legal moves and cannot pass")]
    HasLegalMoves(#[error(not(source))] Player),
}

#[derive(Debug, Clone)]
struct PendingTurn {
    snapshot: Board,
    moves: Vec<Move>,
    visited: Vec<CubeCoord>,
}

/// Interactive turn flow on top of a [`GameState`].
///
/// A turn goes `Idle → Selected → Pending` and is then either confirmed
/// (moves go to the history and the next player is up) or undone (the board
/// returns to the snapshot taken when the first move of the turn was made).
/// Rejected transitions return an error and leave the session untouched.
///
/// # Example
///
/// ```
/// use sternhalma_engine::{CubeCoord, GameSession, Player};
///
/// let mut session = GameSession::standard(2).unwrap();
/// session.select(CubeCoord::new(5, -1, -4)).unwrap();
/// let more = session.move_to(CubeCoord::new(4, -1, -3)).unwrap();
/// assert!(!more);
/// let summary = session.confirm().unwrap();
/// assert_eq!(summary.next_player, Player(1));
/// assert_eq!(session.state().move_history().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameSession {
    state: GameState,
    phase: SessionPhase,
    pending: Option<PendingTurn>,
}

impl GameSession {
    #[must_use]
    pub fn new(state: GameState) -> Self {
        let phase = if state.is_over() {
            SessionPhase::GameOver
        } else {
            SessionPhase::Idle
        };
        Self {
            state,
            phase,
            pending: None,
        }
    }

    pub fn standard(player_count: usize) -> Result<Self, LayoutError> {
        Ok(Self::new(GameState::standard(player_count)?))
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    #[must_use]
    pub fn fingerprint(&self) -> StateFingerprint {
        self.state.fingerprint()
    }

    /// Candidate moves of the selected or moved piece.
    #[must_use]
    pub fn candidates(&self) -> &[Move] {
        match &self.phase {
            SessionPhase::Selected { candidates, .. }
            | SessionPhase::Pending { candidates, .. } => candidates,
            SessionPhase::Idle | SessionPhase::GameOver => &[],
        }
    }

    /// Moves applied in the current, unconfirmed turn.
    #[must_use]
    pub fn pending_moves(&self) -> &[Move] {
        self.pending.as_ref().map_or(&[], |p| &p.moves)
    }

    /// Selects the current player's piece at `coord` and computes its moves.
    ///
    /// Reselecting while a piece is already selected replaces the selection.
    /// On error the previous selection is kept.
    pub fn select(&mut self, coord: CubeCoord) -> Result<&[Move], TurnError> {
        match self.phase {
            SessionPhase::GameOver => return Err(TurnError::GameOver),
            SessionPhase::Pending { .. } => return Err(self.wrong_phase("select a piece")),
            SessionPhase::Idle | SessionPhase::Selected { .. } => {}
        }
        let candidates = move_gen::legal_moves(&self.state, coord).map_err(TurnError::Selection)?;
        self.phase = SessionPhase::Selected {
            piece: coord,
            candidates,
        };
        Ok(self.candidates())
    }

    pub fn deselect(&mut self) -> Result<(), TurnError> {
        if !self.phase.is_selected() {
            return Err(self.wrong_phase("deselect"));
        }
        self.phase = SessionPhase::Idle;
        Ok(())
    }

    /// Moves the selected piece to `dest`.
    ///
    /// Returns `true` when the piece can keep jumping from `dest`.
    pub fn move_to(&mut self, dest: CubeCoord) -> Result<bool, TurnError> {
        let mv = self.find_candidate(dest, |m| m.to == dest)?;
        Ok(self.apply(mv))
    }

    /// Selects `mv.from`, plays `mv` and confirms the turn in one go.
    ///
    /// Nothing changes if any part is rejected.
    pub fn play_move(&mut self, mv: &Move) -> Result<TurnSummary, TurnError> {
        if !self.phase.is_idle() && !self.phase.is_selected() {
            return Err(match self.phase {
                SessionPhase::GameOver => TurnError::GameOver,
                _ => self.wrong_phase("play a move"),
            });
        }
        let previous = self.phase.clone();
        self.select(mv.from)?;
        let found = match self.find_candidate(mv.to, |m| m == mv) {
            Ok(found) => found,
            Err(err) => {
                self.phase = previous;
                return Err(err);
            }
        };
        self.apply(found);
        self.confirm()
    }

    fn find_candidate<F>(&self, requested: CubeCoord, pred: F) -> Result<Move, TurnError>
    where
        F: Fn(&Move) -> bool,
    {
        let candidates = match &self.phase {
            SessionPhase::Selected { candidates, .. }
            | SessionPhase::Pending { candidates, .. } => candidates,
            SessionPhase::GameOver => return Err(TurnError::GameOver),
            SessionPhase::Idle => return Err(self.wrong_phase("move")),
        };
        candidates
            .iter()
            .find(|m| pred(m))
            .cloned()
            .ok_or(TurnError::IllegalDestination(requested))
    }

    fn apply(&mut self, mv: Move) -> bool {
        let pending = self.pending.get_or_insert_with(|| PendingTurn {
            snapshot: *self.state.board(),
            moves: vec![],
            visited: vec![mv.from],
        });
        self.state.apply_to_board(&mv);
        let dest = mv.to;
        let candidates = if mv.is_jump() {
            pending.visited.extend_from_slice(mv.jump_path());
            move_gen::continuation_jumps(
                self.state.board(),
                self.state.rules(),
                dest,
                &pending.visited,
            )
        } else {
            vec![]
        };
        pending.moves.push(mv);
        let more = !candidates.is_empty();
        self.phase = SessionPhase::Pending {
            piece: dest,
            candidates,
        };
        more
    }

    /// Commits the moves of this turn and hands over to the next player.
    pub fn confirm(&mut self) -> Result<TurnSummary, TurnError> {
        if !self.phase.is_pending() {
            return Err(self.wrong_phase("confirm"));
        }
        let pending = self.pending.take().map(|p| p.moves).unwrap_or_default();
        let summary = self.state.commit_turn(pending);
        self.phase = self.resting_phase();
        Ok(summary)
    }

    /// Takes back every move of the unconfirmed turn.
    pub fn undo(&mut self) -> Result<(), TurnError> {
        if !self.phase.is_pending() {
            return Err(self.wrong_phase("undo"));
        }
        if let Some(pending) = self.pending.take() {
            self.state.restore_board(pending.snapshot);
        }
        self.phase = SessionPhase::Idle;
        Ok(())
    }

    /// Skips the turn of a player who has no legal move at all.
    pub fn pass(&mut self) -> Result<TurnSummary, TurnError> {
        match self.phase {
            SessionPhase::GameOver => return Err(TurnError::GameOver),
            SessionPhase::Idle => {}
            SessionPhase::Selected { .. } | SessionPhase::Pending { .. } => {
                return Err(self.wrong_phase("pass"));
            }
        }
        let player = self.state.current_player();
        if move_gen::has_any_move(&self.state, player) {
            return Err(TurnError::HasLegalMoves(player));
        }
        self.force_pass()
    }

    /// Passes without checking for legal moves, as dictated by a server.
    pub(crate) fn force_pass(&mut self) -> Result<TurnSummary, TurnError> {
        if self.phase.is_game_over() {
            return Err(TurnError::GameOver);
        }
        let summary = self.state.commit_turn(vec![]);
        self.phase = self.resting_phase();
        Ok(summary)
    }

    /// Drops any selection or unconfirmed moves.
    pub fn cancel_turn(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.state.restore_board(pending.snapshot);
        }
        self.phase = self.resting_phase();
    }

    /// Restarts the game on the same layout and rules.
    pub fn reset(&mut self) {
        self.pending = None;
        self.state.restart();
        self.phase = self.resting_phase();
    }

    /// Drops every confirmed turn numbered `turn_number` or later.
    pub(crate) fn rewind_to(&mut self, turn_number: u32) {
        self.pending = None;
        self.state.rewind_to(turn_number);
        self.phase = self.resting_phase();
    }

    pub(crate) fn adopt_turn_position(&mut self, turn_number: u32, current_player: Player) {
        self.state.set_turn_position(turn_number, current_player);
        self.phase = self.resting_phase();
    }

    fn resting_phase(&self) -> SessionPhase {
        if self.state.is_over() {
            SessionPhase::GameOver
        } else {
            SessionPhase::Idle
        }
    }

    fn wrong_phase(&self, action: &'static str) -> TurnError {
        TurnError::WrongPhase {
            action,
            phase: self.phase.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        core::{CellContent, Layout, Seat},
        engine::state::RuleSet,
    };

    fn c(q: i32, r: i32) -> CubeCoord {
        CubeCoord::axial(q, r)
    }

    fn custom_session(seats: Vec<Seat>) -> GameSession {
        let layout = Layout::custom(seats, vec![]).unwrap();
        GameSession::new(GameState::new(Arc::new(layout), RuleSet::default()))
    }

    #[test]
    fn test_single_step_turn() {
        let mut session = GameSession::standard(2).unwrap();
        let from = CubeCoord::new(5, -1, -4);
        let to = CubeCoord::new(4, -1, -3);
        session.select(from).unwrap();
        assert!(session.phase().is_selected());
        assert!(!session.move_to(to).unwrap());
        assert!(session.phase().is_pending());
        let summary = session.confirm().unwrap();

        let state = session.state();
        assert_eq!(state.move_history().len(), 1);
        assert_eq!(state.current_player(), Player(1));
        assert_eq!(state.board().get(from), Some(CellContent::Empty));
        assert_eq!(state.board().get(to), Some(CellContent::Piece(Player(0))));
        assert_eq!(state.winner(), None);
        assert_eq!(summary.turn_number, 0);
        assert_eq!(state.turn_number(), 1);
        assert!(session.phase().is_idle());
    }

    #[test]
    fn test_rejected_transitions_do_not_mutate() {
        let mut session = GameSession::standard(2).unwrap();
        let fp = session.fingerprint();
        assert!(matches!(
            session.select(c(0, 0)),
            Err(TurnError::Selection(MoveGenError::NoPiece(_)))
        ));
        assert!(matches!(
            session.select(CubeCoord::new(-5, 1, 4)),
            Err(TurnError::Selection(MoveGenError::NotYourPiece { .. }))
        ));
        assert!(matches!(session.confirm(), Err(TurnError::WrongPhase { .. })));
        assert!(matches!(session.undo(), Err(TurnError::WrongPhase { .. })));
        assert!(matches!(session.move_to(c(0, 0)), Err(TurnError::WrongPhase { .. })));
        assert_eq!(session.fingerprint(), fp);
        assert!(session.phase().is_idle());

        // a failed reselect keeps the earlier selection
        session.select(CubeCoord::new(5, -1, -4)).unwrap();
        assert!(session.select(c(0, 0)).is_err());
        assert!(matches!(
            session.phase(),
            SessionPhase::Selected { piece, .. } if *piece == CubeCoord::new(5, -1, -4)
        ));
        assert!(matches!(
            session.move_to(c(0, 0)),
            Err(TurnError::IllegalDestination(_))
        ));
        assert_eq!(session.fingerprint(), fp);
    }

    #[test]
    fn test_chain_jump_then_undo_restores_board() {
        let standard = Layout::standard(2).unwrap();
        let mut session = custom_session(vec![
            Seat {
                home: vec![c(0, 0)],
                goal: standard.seat(Player(0)).goal().to_vec(),
            },
            Seat {
                home: vec![c(1, 0), c(3, 0)],
                goal: standard.seat(Player(1)).goal().to_vec(),
            },
        ]);
        let before = *session.state().board();

        session.select(c(0, 0)).unwrap();
        assert!(session.move_to(c(2, 0)).unwrap());
        assert_eq!(session.candidates().len(), 1);
        assert!(!session.move_to(c(4, 0)).unwrap());
        assert_eq!(session.pending_moves().len(), 2);
        assert_eq!(
            session.state().board().get(c(4, 0)),
            Some(CellContent::Piece(Player(0)))
        );

        session.undo().unwrap();
        assert_eq!(*session.state().board(), before);
        assert!(session.phase().is_idle());
        assert!(session.state().move_history().is_empty());
        assert_eq!(session.state().current_player(), Player(0));
    }

    #[test]
    fn test_chain_confirm_records_every_move() {
        let standard = Layout::standard(2).unwrap();
        let mut session = custom_session(vec![
            Seat {
                home: vec![c(0, 0)],
                goal: standard.seat(Player(0)).goal().to_vec(),
            },
            Seat {
                home: vec![c(1, 0), c(3, 0)],
                goal: standard.seat(Player(1)).goal().to_vec(),
            },
        ]);
        session.select(c(0, 0)).unwrap();
        session.move_to(c(2, 0)).unwrap();
        session.move_to(c(4, 0)).unwrap();
        session.confirm().unwrap();
        let history = session.state().move_history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.player == Player(0) && h.turn_number == 0));
    }

    #[test]
    fn test_finish_and_game_over() {
        let mut session = custom_session(vec![
            Seat {
                home: vec![c(0, 0)],
                goal: vec![c(1, 0)],
            },
            Seat {
                home: vec![c(-3, 0)],
                goal: vec![c(-4, 0)],
            },
        ]);
        let summary = session.play_move(&Move::step(c(0, 0), c(1, 0))).unwrap();
        assert_eq!(summary.newly_finished, vec![Player(0)]);
        assert_eq!(session.state().winner(), Some(Player(0)));
        assert_eq!(session.state().current_player(), Player(1));
        assert!(!summary.game_over);

        // the finished player is skipped from now on
        let summary = session.play_move(&Move::step(c(-3, 0), c(-4, 0))).unwrap();
        assert!(summary.game_over);
        assert!(session.phase().is_game_over());
        assert_eq!(session.state().winner(), Some(Player(0)));
        let finished = session.state().finished_players();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[1].move_count, 1);

        assert_eq!(session.select(c(1, 0)), Err(TurnError::GameOver));
        assert_eq!(session.pass(), Err(TurnError::GameOver));
    }

    #[test]
    fn test_pass_only_without_moves() {
        // the tip piece is walled in by the other player's pieces
        let standard = Layout::standard(2).unwrap();
        let mut session = custom_session(vec![
            Seat {
                home: vec![c(8, -4)],
                goal: standard.seat(Player(0)).goal().to_vec(),
            },
            Seat {
                home: vec![c(7, -3), c(7, -4), c(6, -2), c(6, -4)],
                goal: standard.seat(Player(1)).goal().to_vec(),
            },
        ]);
        let summary = session.pass().unwrap();
        assert_eq!(summary.moves, 0);
        assert_eq!(session.state().current_player(), Player(1));
        assert!(session.state().move_history().is_empty());
        assert_eq!(session.pass(), Err(TurnError::HasLegalMoves(Player(1))));
    }

    #[test]
    fn test_play_move_rejects_unknown_move() {
        let mut session = GameSession::standard(2).unwrap();
        let bogus = Move::step(CubeCoord::new(5, -1, -4), c(0, 0));
        assert_eq!(
            session.play_move(&bogus),
            Err(TurnError::IllegalDestination(c(0, 0)))
        );
        assert!(session.phase().is_idle());
        assert!(session.state().move_history().is_empty());
    }

    #[test]
    fn test_reset_invalidates_fingerprint() {
        let mut session = GameSession::standard(3).unwrap();
        let fp = session.fingerprint();
        session.reset();
        assert_ne!(session.fingerprint(), fp);
        assert_eq!(session.state().turn_number(), 0);
    }
}
