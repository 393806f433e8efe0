//! Headless games between search engines.

use sternhalma_engine::{GameSession, GameState, LayoutError, Move, Player, TurnError};
use tracing::debug;

use crate::search::{SearchEngine, SearchError};

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// First player to finish, `None` when the turn limit was reached.
    pub winner: Option<Player>,
    /// Turns played, passes included.
    pub turns: u32,
    pub state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MatchError {
    #[display("{engines} engines for {players} players")]
    PlayerCount { engines: usize, players: usize },
    #[display("no layout: {_0}")]
    Layout(LayoutError),
    #[display("search failed: {_0}")]
    Search(SearchError),
    #[display("engine produced an illegal turn: {_0}")]
    Turn(TurnError),
}

/// Plays a game on the standard layout for `engines.len()` players.
///
/// `engines[i]` plays for `Player(i)`.
pub fn play_standard(
    engines: &mut [SearchEngine],
    max_turns: u32,
) -> Result<MatchOutcome, MatchError> {
    let state = GameState::standard(engines.len()).map_err(MatchError::Layout)?;
    play_match(state, engines, max_turns, |_, _, _| {})
}

/// Plays `state` to the first finisher or until `max_turns` turns have been
/// played.
///
/// `on_turn` is called after every turn with the new state, the player that
/// moved and its move (`None` for a pass).
pub fn play_match<F>(
    state: GameState,
    engines: &mut [SearchEngine],
    max_turns: u32,
    mut on_turn: F,
) -> Result<MatchOutcome, MatchError>
where
    F: FnMut(&GameState, Player, Option<&Move>),
{
    if engines.len() != state.player_count() {
        return Err(MatchError::PlayerCount {
            engines: engines.len(),
            players: state.player_count(),
        });
    }
    let mut session = GameSession::new(state);
    let mut turns = 0;
    while turns < max_turns && session.state().winner().is_none() && !session.state().is_over() {
        let player = session.state().current_player();
        match engines[player.index()].choose_move(session.state()) {
            Ok(mv) => {
                session.play_move(&mv).map_err(MatchError::Turn)?;
                on_turn(session.state(), player, Some(&mv));
            }
            Err(SearchError::NoLegalMoves(_)) => {
                session.pass().map_err(MatchError::Turn)?;
                on_turn(session.state(), player, None);
            }
            Err(err) => return Err(MatchError::Search(err)),
        }
        turns += 1;
    }

    let state = session.into_state();
    let winner = state.winner();
    debug!(?winner, turns, "match finished");
    Ok(MatchOutcome {
        winner,
        turns,
        state,
    })
}
