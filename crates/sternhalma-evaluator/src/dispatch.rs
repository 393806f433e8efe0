//! Running a search off the caller's thread.
//!
//! The search works on a snapshot of the position. Its result is only used
//! if the live game still has the fingerprint the snapshot was taken with;
//! anything that changed the position in the meantime (a human move, an
//! undo, a reset, a server reconciliation) makes the result stale.

use std::thread::{self, JoinHandle};

use sternhalma_engine::{GameState, Move, StateFingerprint};

use crate::search::{SearchEngine, SearchError};

#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum SearchOutcome {
    Ready(Move),
    /// The position changed while searching; the result was dropped.
    Stale,
    Failed(SearchError),
}

/// A search running on its own thread.
#[derive(Debug)]
#[must_use]
pub struct PendingSearch {
    fingerprint: StateFingerprint,
    handle: JoinHandle<Result<Move, SearchError>>,
}

/// Starts searching a snapshot of `state` on a new thread.
///
/// # Example
///
/// ```
/// use sternhalma_engine::GameSession;
/// use sternhalma_evaluator::{
///     difficulty::Difficulty,
///     dispatch::{SearchOutcome, spawn_search},
///     genome::Genome,
///     search::SearchEngine,
/// };
///
/// let mut session = GameSession::standard(2).unwrap();
/// let engine = SearchEngine::new(Difficulty::Easy.params(), Genome::default(), 3);
/// let pending = spawn_search(engine, session.state());
/// match pending.wait(session.fingerprint()) {
///     SearchOutcome::Ready(mv) => {
///         session.play_move(&mv).unwrap();
///     }
///     outcome => panic!("unexpected {outcome:?}"),
/// }
/// ```
pub fn spawn_search(mut engine: SearchEngine, state: &GameState) -> PendingSearch {
    let snapshot = state.clone();
    let fingerprint = snapshot.fingerprint();
    let handle = thread::spawn(move || engine.choose_move(&snapshot));
    PendingSearch {
        fingerprint,
        handle,
    }
}

impl PendingSearch {
    /// Fingerprint of the position being searched.
    #[must_use]
    pub fn fingerprint(&self) -> StateFingerprint {
        self.fingerprint
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the search ends and checks the result against the
    /// fingerprint of the live position.
    #[must_use]
    pub fn wait(self, current: StateFingerprint) -> SearchOutcome {
        let result = self
            .handle
            .join()
            .unwrap_or(Err(SearchError::WorkerPanicked));
        if current != self.fingerprint {
            return SearchOutcome::Stale;
        }
        match result {
            Ok(mv) => SearchOutcome::Ready(mv),
            Err(err) => SearchOutcome::Failed(err),
        }
    }
}
