use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{
    Board, CellIndex, CubeCoord, Layout, LayoutError, Move, MoveKind, Player, SeatGeometry,
    cell_index,
};

/// Variant switches of the movement rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// A piece may step into its own goal region onto a cell held by another
    /// player's piece, sending that piece back to the mover's origin.
    pub allow_swap: bool,
    /// Walls can be hopped over like pieces.
    pub jump_over_walls: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            allow_swap: true,
            jump_over_walls: true,
        }
    }
}

/// A confirmed move together with who played it and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub player: Player,
    pub turn_number: u32,
    pub mv: Move,
}

/// A player who brought every piece into their goal region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRecord {
    pub player: Player,
    /// Number of turns the player had confirmed when finishing.
    pub move_count: u32,
}

/// Identifies a game position for staleness checks of background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateFingerprint {
    pub current_player: Player,
    pub turn_number: u32,
    pub revision: u64,
}

/// Result of committing one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub player: Player,
    pub turn_number: u32,
    pub moves: usize,
    /// Players that finished as a result of this turn, in check order.
    pub newly_finished: Vec<Player>,
    pub next_player: Player,
    pub game_over: bool,
}

/// Everything needed to take back a turn played with
/// [`GameState::play_turn`] or [`GameState::pass_turn`].
#[derive(Debug, Clone)]
#[must_use]
pub struct TurnUndo {
    moves: Vec<Move>,
    player: Player,
    turn_number: u32,
    history_len: usize,
    finished_len: usize,
    winner: Option<Player>,
}

/// Full state of one game.
///
/// The state only changes through confirmed turns (see
/// [`GameSession`](crate::GameSession)) or through the make/unmake pair
/// [`Self::play_turn`] / [`Self::revert_turn`] used by headless search.
#[derive(Debug, Clone)]
pub struct GameState {
    layout: Arc<Layout>,
    rules: RuleSet,
    board: Board,
    active_players: Vec<Player>,
    current_player: Player,
    move_history: Vec<HistoryEntry>,
    winner: Option<Player>,
    finished_players: Vec<FinishRecord>,
    turn_number: u32,
    turns_taken: Vec<u32>,
    revision: u64,
}

impl GameState {
    /// Starts a game from `layout`.
    ///
    /// Active players are the seats holding at least one piece, in seat order;
    /// the first of them moves first.
    #[must_use]
    pub fn new(layout: Arc<Layout>, rules: RuleSet) -> Self {
        let board = layout.initial_board();
        let active_players: Vec<_> = layout
            .players()
            .filter(|&p| board.piece_count(p) > 0)
            .collect();
        let current_player = active_players.first().copied().unwrap_or(Player(0));
        let turns_taken = vec![0; layout.player_count()];
        Self {
            layout,
            rules,
            board,
            active_players,
            current_player,
            move_history: vec![],
            winner: None,
            finished_players: vec![],
            turn_number: 0,
            turns_taken,
            revision: 0,
        }
    }

    /// Starts a game on the standard layout with default rules.
    pub fn standard(player_count: usize) -> Result<Self, LayoutError> {
        Ok(Self::new(
            Arc::new(Layout::standard(player_count)?),
            RuleSet::default(),
        ))
    }

    #[must_use]
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    #[must_use]
    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.layout.player_count()
    }

    #[must_use]
    pub fn active_players(&self) -> &[Player] {
        &self.active_players
    }

    #[must_use]
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    #[must_use]
    pub fn move_history(&self) -> &[HistoryEntry] {
        &self.move_history
    }

    #[must_use]
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    #[must_use]
    pub fn finished_players(&self) -> &[FinishRecord] {
        &self.finished_players
    }

    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    #[must_use]
    pub fn seat(&self, player: Player) -> &SeatGeometry {
        self.layout.seat(player)
    }

    #[must_use]
    pub fn has_finished(&self, player: Player) -> bool {
        self.finished_players.iter().any(|f| f.player == player)
    }

    /// Returns `true` once every active player has finished.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.active_players.iter().all(|&p| self.has_finished(p))
    }

    #[must_use]
    pub fn fingerprint(&self) -> StateFingerprint {
        StateFingerprint {
            current_player: self.current_player,
            turn_number: self.turn_number,
            revision: self.revision,
        }
    }

    /// Returns `true` if every piece of `player` sits in their goal region.
    #[must_use]
    pub fn all_in_goal(&self, player: Player) -> bool {
        let seat = self.seat(player);
        let mut pieces = self.board.pieces_of(player).peekable();
        pieces.peek().is_some() && pieces.all(|i| seat.is_goal(i))
    }

    /// The next active player after `player` that has not finished, wrapping
    /// around. `None` when every active player has finished.
    #[must_use]
    pub fn next_player_after(&self, player: Player) -> Option<Player> {
        let n = self.active_players.len();
        let start = self
            .active_players
            .iter()
            .position(|&p| p == player)
            .map_or(0, |i| i + 1);
        (0..n)
            .map(|k| self.active_players[(start + k) % n])
            .find(|&p| !self.has_finished(p))
    }

    pub(crate) fn apply_to_board(&mut self, mv: &Move) {
        let (from, to) = move_cells(mv);
        match mv.kind {
            MoveKind::Step | MoveKind::Jump(_) => self.board.relocate(from, to),
            MoveKind::Swap => self.board.exchange(from, to),
        }
        self.revision += 1;
    }

    fn unapply_from_board(&mut self, mv: &Move) {
        let (from, to) = move_cells(mv);
        match mv.kind {
            MoveKind::Step | MoveKind::Jump(_) => self.board.relocate(to, from),
            MoveKind::Swap => self.board.exchange(from, to),
        }
    }

    pub(crate) fn restore_board(&mut self, board: Board) {
        self.board = board;
        self.revision += 1;
    }

    /// Appends this turn's moves to the history, records finishers and hands
    /// the turn to the next unfinished player.
    pub(crate) fn commit_turn(&mut self, moves: Vec<Move>) -> TurnSummary {
        let player = self.current_player;
        let turn_number = self.turn_number;
        let count = moves.len();
        self.move_history
            .extend(moves.into_iter().map(|mv| HistoryEntry {
                player,
                turn_number,
                mv,
            }));
        if count > 0 {
            self.turns_taken[player.index()] += 1;
        }
        let newly_finished = self.record_finishers(player);
        self.advance_from(player);
        TurnSummary {
            player,
            turn_number,
            moves: count,
            newly_finished,
            next_player: self.current_player,
            game_over: self.is_over(),
        }
    }

    fn record_finishers(&mut self, mover: Player) -> Vec<Player> {
        // the mover first; a swap can also complete another player's goal
        let candidates: Vec<_> = std::iter::once(mover)
            .chain(self.active_players.iter().copied().filter(|&p| p != mover))
            .filter(|&p| self.active_players.contains(&p))
            .collect();
        let mut finished = vec![];
        for p in candidates {
            if !self.has_finished(p) && self.all_in_goal(p) {
                self.finished_players.push(FinishRecord {
                    player: p,
                    move_count: self.turns_taken[p.index()],
                });
                self.winner.get_or_insert(p);
                finished.push(p);
            }
        }
        finished
    }

    fn advance_from(&mut self, player: Player) {
        self.turn_number += 1;
        self.current_player = self.next_player_after(player).unwrap_or(player);
        self.revision += 1;
    }

    /// Plays `mv` as a complete turn for the current player.
    ///
    /// The move is not validated; it must come from the move generator for
    /// the current player. Used by search, which takes the turn back with
    /// [`Self::revert_turn`].
    pub fn play_turn(&mut self, mv: Move) -> TurnUndo {
        debug_assert_eq!(
            self.board.get(mv.from).and_then(|c| c.piece()),
            Some(self.current_player)
        );
        let undo = self.undo_point(vec![mv.clone()]);
        self.apply_to_board(&mv);
        self.commit_turn(vec![mv]);
        undo
    }

    /// Hands the turn to the next player without moving.
    pub fn pass_turn(&mut self) -> TurnUndo {
        let undo = self.undo_point(vec![]);
        let player = self.current_player;
        self.advance_from(player);
        undo
    }

    fn undo_point(&self, moves: Vec<Move>) -> TurnUndo {
        TurnUndo {
            moves,
            player: self.current_player,
            turn_number: self.turn_number,
            history_len: self.move_history.len(),
            finished_len: self.finished_players.len(),
            winner: self.winner,
        }
    }

    /// Takes back the most recent [`Self::play_turn`] / [`Self::pass_turn`].
    pub fn revert_turn(&mut self, undo: TurnUndo) {
        for mv in undo.moves.iter().rev() {
            self.unapply_from_board(mv);
        }
        if !undo.moves.is_empty() {
            self.turns_taken[undo.player.index()] -= 1;
        }
        self.move_history.truncate(undo.history_len);
        self.finished_players.truncate(undo.finished_len);
        self.winner = undo.winner;
        self.current_player = undo.player;
        self.turn_number = undo.turn_number;
        self.revision += 1;
    }

    /// Back to the starting position. The revision keeps counting so
    /// fingerprints taken before the restart never match again.
    pub(crate) fn restart(&mut self) {
        let revision = self.revision + 1;
        *self = Self::new(Arc::clone(&self.layout), self.rules);
        self.revision = revision;
    }

    /// Rebuilds the position as it stood before turn `turn_number` by
    /// replaying the earlier history from the start.
    ///
    /// Passed turns leave no history, so each replayed turn takes its number
    /// and player from its history entries.
    pub(crate) fn rewind_to(&mut self, turn_number: u32) {
        let history = std::mem::take(&mut self.move_history);
        self.restart();
        let mut kept = history
            .into_iter()
            .filter(|h| h.turn_number < turn_number)
            .peekable();
        while let Some(first) = kept.next() {
            let (turn, player) = (first.turn_number, first.player);
            let mut moves = vec![first.mv];
            while let Some(h) = kept.next_if(|h| h.turn_number == turn) {
                moves.push(h.mv);
            }
            self.set_turn_position(turn, player);
            for mv in &moves {
                self.apply_to_board(mv);
            }
            self.commit_turn(moves);
        }
    }

    /// Adopts an externally authoritative turn position.
    pub(crate) fn set_turn_position(&mut self, turn_number: u32, current_player: Player) {
        self.turn_number = turn_number;
        self.current_player = current_player;
        self.revision += 1;
    }

    /// Iterates the coordinates of `player`'s pieces in board order.
    pub fn pieces_of(&self, player: Player) -> impl Iterator<Item = CubeCoord> + '_ {
        self.board.pieces_of(player).map(crate::core::cell_coord)
    }
}

fn move_cells(mv: &Move) -> (CellIndex, CellIndex) {
    let from = cell_index(mv.from).unwrap_or_else(|| panic!("{} is off the board", mv.from));
    let to = cell_index(mv.to).unwrap_or_else(|| panic!("{} is off the board", mv.to));
    (from, to)
}
