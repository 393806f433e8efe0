//! Serialized turns exchanged with an authoritative game server.
//!
//! A completed turn travels as a list of [`WireMove`]s:
//!
//! ```json
//! [{ "from": "5,-1", "to": "3,-1", "jumpPath": ["3,-1"] }]
//! ```
//!
//! Local play is optimistic: moves are applied right away and later
//! reconciled against the server's [`ServerSnapshot`], which always wins.

use serde::{Deserialize, Serialize};

use crate::{
    core::{CubeCoord, Move, Player},
    engine::{
        session::{GameSession, TurnError},
        state::{GameState, HistoryEntry, TurnSummary},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMove {
    pub from: CubeCoord,
    pub to: CubeCoord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_path: Option<Vec<CubeCoord>>,
}

impl From<&Move> for WireMove {
    fn from(mv: &Move) -> Self {
        Self {
            from: mv.from,
            to: mv.to,
            jump_path: mv.is_jump().then(|| mv.jump_path().to_vec()),
        }
    }
}

/// Serializes the moves of one turn.
#[must_use]
pub fn encode_turn(moves: &[Move]) -> Vec<WireMove> {
    moves.iter().map(WireMove::from).collect()
}

/// One confirmed turn as recorded by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTurn {
    pub turn_number: u32,
    pub player: Player,
    /// Empty for a passed turn.
    pub moves: Vec<WireMove>,
}

/// Authoritative game progress as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    pub turn_number: u32,
    pub current_player: Player,
    pub turns: Vec<ServerTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum WireError {
    #[display("empty turn")]
    EmptyTurn,
    #[display("move {index} starts at {from}, but the moving piece is at {expected}")]
    WrongPiece {
        index: usize,
        from: CubeCoord,
        expected: CubeCoord,
    },
    #[display("move {index} of turn rejected: {source}")]
    Rejected { index: usize, source: TurnError },
    #[display("server turn {turn_number} rejected: {source}")]
    ServerTurn {
        turn_number: u32,
        #[error(source)]
        source: Box<WireError>,
    },
}

/// Replays a whole serialized turn for the current player and confirms it.
///
/// The turn is applied atomically: if any move is rejected the session is
/// rolled back to where it was before the call. Any selection or
/// unconfirmed local move is dropped first.
pub fn apply_wire_turn(
    session: &mut GameSession,
    moves: &[WireMove],
) -> Result<TurnSummary, WireError> {
    if moves.is_empty() {
        return Err(WireError::EmptyTurn);
    }
    session.cancel_turn();
    let result = replay_moves(session, moves);
    if result.is_err() {
        session.cancel_turn();
    }
    result
}

fn replay_moves(session: &mut GameSession, moves: &[WireMove]) -> Result<TurnSummary, WireError> {
    let mut at = moves[0].from;
    for (index, wm) in moves.iter().enumerate() {
        if wm.from != at {
            return Err(WireError::WrongPiece {
                index,
                from: wm.from,
                expected: at,
            });
        }
        if index == 0 {
            session
                .select(wm.from)
                .map_err(|source| WireError::Rejected { index, source })?;
        }
        let mv = matching_candidate(session.candidates(), wm)
            .ok_or(WireError::Rejected {
                index,
                source: TurnError::IllegalDestination(wm.to),
            })?
            .to;
        session
            .move_to(mv)
            .map_err(|source| WireError::Rejected { index, source })?;
        at = wm.to;
    }
    session
        .confirm()
        .map_err(|source| WireError::Rejected {
            index: moves.len(),
            source,
        })
}

// a jump path on the wire may be split differently than ours, so only the
// destination and the kind of move have to agree
fn matching_candidate<'a>(candidates: &'a [Move], wm: &WireMove) -> Option<&'a Move> {
    candidates
        .iter()
        .find(|m| m.to == wm.to && m.is_jump() == wm.jump_path.is_some())
        .or_else(|| candidates.iter().find(|m| m.to == wm.to))
}

/// Brings the local session in line with the server.
///
/// Local unconfirmed moves are discarded. Confirmed local turns are checked
/// against the server's record: from the first turn that differs, or that
/// the server has not reached yet, the local history is dropped. Server turns
/// not yet applied locally are then replayed in order, and finally the
/// server's turn number and current player are adopted as-is.
///
/// The session is only updated when every server turn applies; on error it
/// is left exactly as it was. Reconciling twice with the same snapshot
/// changes nothing the second time.
pub fn reconcile(session: &mut GameSession, snapshot: &ServerSnapshot) -> Result<(), WireError> {
    let mut next = session.clone();
    next.cancel_turn();
    if let Some(turn_number) = first_divergence(next.state(), snapshot) {
        next.rewind_to(turn_number);
    }
    for turn in &snapshot.turns {
        if turn.turn_number < next.state().turn_number() {
            continue;
        }
        next.adopt_turn_position(turn.turn_number, turn.player);
        let applied = if turn.moves.is_empty() {
            next.force_pass()
                .map(drop)
                .map_err(|source| WireError::Rejected { index: 0, source })
        } else {
            apply_wire_turn(&mut next, &turn.moves).map(drop)
        };
        applied.map_err(|err| WireError::ServerTurn {
            turn_number: turn.turn_number,
            source: Box::new(err),
        })?;
    }
    let state = next.state();
    if state.turn_number() != snapshot.turn_number
        || state.current_player() != snapshot.current_player
    {
        next.adopt_turn_position(snapshot.turn_number, snapshot.current_player);
    }
    *session = next;
    Ok(())
}

// earliest local turn that must be replaced by the server's version
fn first_divergence(state: &GameState, snapshot: &ServerSnapshot) -> Option<u32> {
    let local_turn = state.turn_number();
    let differs = snapshot
        .turns
        .iter()
        .filter(|turn| turn.turn_number < local_turn)
        .find(|turn| !matches_local(state.move_history(), turn))
        .map(|turn| turn.turn_number);
    let ahead = (snapshot.turn_number < local_turn).then_some(snapshot.turn_number);
    differs.into_iter().chain(ahead).min()
}

// turns are compared by player and end points, since a chain jump may be
// split into moves differently on each side
fn matches_local(history: &[HistoryEntry], turn: &ServerTurn) -> bool {
    let mut local = history.iter().filter(|h| h.turn_number == turn.turn_number);
    let first = local.next();
    let last = local.last().or(first);
    match (first, last, turn.moves.first(), turn.moves.last()) {
        (None, _, None, _) => true,
        (Some(first), Some(last), Some(server_first), Some(server_last)) => {
            first.player == turn.player
                && first.mv.from == server_first.from
                && last.mv.to == server_last.to
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        core::{Layout, Seat},
        engine::state::RuleSet,
    };

    fn c(q: i32, r: i32) -> CubeCoord {
        CubeCoord::axial(q, r)
    }

    fn opening_turns() -> Vec<Vec<WireMove>> {
        let json = r#"[
            [{ "from": "5,-2", "to": "4,-2" }],
            [{ "from": "-5,1", "to": "-4,1" }],
            [{ "from": "6,-2", "to": "4,0", "jumpPath": ["4,0"] }]
        ]"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_wire_json_shape() {
        let mv = Move::jump(c(6, -2), vec![c(4, 0)]);
        let json = serde_json::to_string(&WireMove::from(&mv)).unwrap();
        assert_eq!(json, r#"{"from":"6,-2","to":"4,0","jumpPath":["4,0"]}"#);
        let step = WireMove::from(&Move::step(c(5, -1), c(4, -1)));
        assert_eq!(
            serde_json::to_string(&step).unwrap(),
            r#"{"from":"5,-1","to":"4,-1"}"#
        );
    }

    #[test]
    fn test_replay_is_idempotent() {
        let turns = opening_turns();
        let mut a = GameSession::standard(2).unwrap();
        let mut b = GameSession::standard(2).unwrap();
        for turn in &turns {
            apply_wire_turn(&mut a, turn).unwrap();
        }
        for turn in &turns {
            apply_wire_turn(&mut b, turn).unwrap();
        }
        assert_eq!(a.state().board(), b.state().board());
        assert_eq!(a.state().move_history(), b.state().move_history());
        assert_eq!(a.state().turn_number(), 3);
        assert_eq!(a.state().current_player(), Player(1));

        // encoding the recorded history gives back the same turns
        let encoded: Vec<_> = a
            .state()
            .move_history()
            .iter()
            .map(|h| vec![WireMove::from(&h.mv)])
            .collect();
        assert_eq!(encoded, turns);
    }

    #[test]
    fn test_rejected_turn_rolls_back() {
        let mut session = GameSession::standard(2).unwrap();
        let before = *session.state().board();
        let bad = vec![
            WireMove {
                from: c(5, -1),
                to: c(4, -1),
                jump_path: None,
            },
            WireMove {
                from: c(4, -1),
                to: c(3, -1),
                jump_path: None,
            },
        ];
        let err = apply_wire_turn(&mut session, &bad).unwrap_err();
        assert!(matches!(err, WireError::Rejected { index: 1, .. }));
        assert_eq!(*session.state().board(), before);
        assert!(session.phase().is_idle());
        assert!(session.state().move_history().is_empty());
        assert_eq!(apply_wire_turn(&mut session, &[]), Err(WireError::EmptyTurn));
    }

    #[test]
    fn test_reconcile_discards_local_moves_and_adopts_server() {
        let turns = opening_turns();
        let mut session = GameSession::standard(2).unwrap();
        // optimistic local move that the server never saw
        session.select(CubeCoord::new(5, -3, -2)).unwrap();
        session.move_to(CubeCoord::new(4, -3, -1)).unwrap();

        let snapshot = ServerSnapshot {
            turn_number: 2,
            current_player: Player(0),
            turns: vec![
                ServerTurn {
                    turn_number: 0,
                    player: Player(0),
                    moves: turns[0].clone(),
                },
                ServerTurn {
                    turn_number: 1,
                    player: Player(1),
                    moves: turns[1].clone(),
                },
            ],
        };
        reconcile(&mut session, &snapshot).unwrap();
        let state = session.state();
        assert_eq!(state.turn_number(), 2);
        assert_eq!(state.current_player(), Player(0));
        assert_eq!(state.move_history().len(), 2);
        assert!(state.board().get(CubeCoord::new(5, -3, -2)).unwrap().is_piece());
        assert!(state.board().get(CubeCoord::new(4, -2, -2)).unwrap().is_piece());

        let board = *state.board();
        reconcile(&mut session, &snapshot).unwrap();
        assert_eq!(*session.state().board(), board);
        assert_eq!(session.state().move_history().len(), 2);
    }

    fn step(from: CubeCoord, to: CubeCoord) -> Vec<WireMove> {
        vec![WireMove {
            from,
            to,
            jump_path: None,
        }]
    }

    fn server_turn(turn_number: u32, player: u8, moves: Vec<WireMove>) -> ServerTurn {
        ServerTurn {
            turn_number,
            player: Player(player),
            moves,
        }
    }

    #[test]
    fn test_reconcile_replaces_diverging_confirmed_turn() {
        let mut session = GameSession::standard(2).unwrap();
        session.play_move(&Move::step(c(5, -1), c(4, -1))).unwrap();

        let snapshot = ServerSnapshot {
            turn_number: 1,
            current_player: Player(1),
            turns: vec![server_turn(0, 0, step(c(5, -2), c(4, -2)))],
        };
        reconcile(&mut session, &snapshot).unwrap();
        let state = session.state();
        let board = state.board();
        assert!(board.get(c(4, -1)).unwrap().is_empty());
        assert!(board.get(c(5, -1)).unwrap().is_piece());
        assert!(board.get(c(4, -2)).unwrap().is_piece());
        assert!(board.get(c(5, -2)).unwrap().is_empty());
        assert_eq!(state.move_history().len(), 1);
        assert_eq!(state.move_history()[0].mv.to, c(4, -2));
        assert_eq!(state.turn_number(), 1);
        assert_eq!(state.current_player(), Player(1));

        let board = *state.board();
        reconcile(&mut session, &snapshot).unwrap();
        assert_eq!(*session.state().board(), board);
        assert_eq!(session.state().move_history().len(), 1);
    }

    #[test]
    fn test_reconcile_drops_turns_the_server_has_not_seen() {
        let mut session = GameSession::standard(2).unwrap();
        let start = *session.state().board();
        session.play_move(&Move::step(c(5, -1), c(4, -1))).unwrap();

        let snapshot = ServerSnapshot {
            turn_number: 0,
            current_player: Player(0),
            turns: vec![],
        };
        reconcile(&mut session, &snapshot).unwrap();
        assert_eq!(*session.state().board(), start);
        assert!(session.state().move_history().is_empty());
        assert_eq!(session.state().turn_number(), 0);
        assert_eq!(session.state().current_player(), Player(0));
    }

    #[test]
    fn test_failed_reconcile_leaves_session_untouched() {
        let mut session = GameSession::standard(2).unwrap();
        let before = *session.state().board();
        let fingerprint = session.fingerprint();

        let snapshot = ServerSnapshot {
            turn_number: 2,
            current_player: Player(0),
            turns: vec![
                server_turn(0, 0, step(c(5, -2), c(4, -2))),
                server_turn(1, 1, step(c(0, 0), c(1, 0))),
            ],
        };
        let err = reconcile(&mut session, &snapshot).unwrap_err();
        assert!(matches!(err, WireError::ServerTurn { turn_number: 1, .. }));
        let state = session.state();
        assert_eq!(*state.board(), before);
        assert!(state.move_history().is_empty());
        assert_eq!(state.turn_number(), 0);
        assert_eq!(state.current_player(), Player(0));
        assert_eq!(session.fingerprint(), fingerprint);
    }

    #[test]
    fn test_reconcile_rejects_pass_after_game_over() {
        let layout = Layout::custom(
            vec![
                Seat {
                    home: vec![c(0, 0)],
                    goal: vec![c(1, 0)],
                },
                Seat {
                    home: vec![c(-3, 0)],
                    goal: vec![c(-4, 0)],
                },
            ],
            vec![],
        )
        .unwrap();
        let mut session = GameSession::new(GameState::new(Arc::new(layout), RuleSet::default()));

        let finished = ServerSnapshot {
            turn_number: 2,
            current_player: Player(1),
            turns: vec![
                server_turn(0, 0, step(c(0, 0), c(1, 0))),
                server_turn(1, 1, step(c(-3, 0), c(-4, 0))),
            ],
        };
        reconcile(&mut session, &finished).unwrap();
        assert!(session.phase().is_game_over());

        let mut with_pass = finished.clone();
        with_pass.turn_number = 3;
        with_pass.turns.push(server_turn(2, 0, vec![]));
        let history = session.state().move_history().to_vec();
        let err = reconcile(&mut session, &with_pass).unwrap_err();
        assert_eq!(
            err,
            WireError::ServerTurn {
                turn_number: 2,
                source: Box::new(WireError::Rejected {
                    index: 0,
                    source: TurnError::GameOver,
                }),
            }
        );
        assert_eq!(session.state().move_history(), history.as_slice());
        assert_eq!(session.state().turn_number(), 2);
    }
}
