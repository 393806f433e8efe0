//! Persistence of training progress.
//!
//! The scheduler itself holds nothing between invocations; everything lives
//! behind a [`TrainingStore`]. Records are JSON documents, so every store
//! shares [`encode`] / [`decode`].

use serde::{Serialize, de::DeserializeOwned};

use crate::state::{BestGenomeRecord, TrainingState};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("storage I/O failed: {_0}")]
    Io(std::io::Error),
    #[display("stored record is malformed: {_0}")]
    Format(serde_json::Error),
    #[display("storage unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
}

pub trait TrainingStore {
    fn load_state(&self) -> Result<Option<TrainingState>, StoreError>;
    fn save_state(&mut self, state: &TrainingState) -> Result<(), StoreError>;
    fn load_best(&self) -> Result<Option<BestGenomeRecord>, StoreError>;
    fn save_best(&mut self, best: &BestGenomeRecord) -> Result<(), StoreError>;
}

pub fn encode<T>(value: &T) -> Result<String, StoreError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value).map_err(StoreError::Format)
}

pub fn decode<T>(text: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(text).map_err(StoreError::Format)
}

/// Keeps the JSON records in memory.
///
/// Saves can be made to fail, which simulates an unavailable backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Option<String>,
    best: Option<String>,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Number of successful saves of either record.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves
    }

    #[must_use]
    pub fn raw_state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn set_raw_state(&mut self, text: impl Into<String>) {
        self.state = Some(text.into());
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Unavailable("saves are disabled".to_owned()));
        }
        Ok(())
    }
}

impl TrainingStore for MemoryStore {
    fn load_state(&self) -> Result<Option<TrainingState>, StoreError> {
        self.state.as_deref().map(decode).transpose()
    }

    fn save_state(&mut self, state: &TrainingState) -> Result<(), StoreError> {
        self.check_available()?;
        self.state = Some(encode(state)?);
        self.saves += 1;
        Ok(())
    }

    fn load_best(&self) -> Result<Option<BestGenomeRecord>, StoreError> {
        self.best.as_deref().map(decode).transpose()
    }

    fn save_best(&mut self, best: &BestGenomeRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.best = Some(encode(best)?);
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sternhalma_evaluator::genome::Genome;

    use super::*;
    use crate::state::TrainingConfig;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load_state().unwrap().is_none());
        assert!(store.load_best().unwrap().is_none());

        let state = TrainingState::new(TrainingConfig::default(), Utc::now());
        store.save_state(&state).unwrap();
        let loaded = store.load_state().unwrap().unwrap();
        assert_eq!(loaded.population, state.population);

        let best = BestGenomeRecord {
            genome: Genome::default(),
            fitness: 12.0,
            cycle: 0,
            generation: 3,
            updated_at: Utc::now(),
        };
        store.save_best(&best).unwrap();
        assert_eq!(store.load_best().unwrap(), Some(best));
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_failing_saves_keep_old_record() {
        let mut store = MemoryStore::new();
        store.set_raw_state("{}");
        store.set_fail_saves(true);
        let state = TrainingState::new(TrainingConfig::default(), Utc::now());
        assert!(matches!(
            store.save_state(&state),
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.raw_state(), Some("{}"));
        assert!(matches!(store.load_state(), Err(StoreError::Format(_))));
    }
}
