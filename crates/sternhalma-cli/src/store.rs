use std::{
    fs, io,
    path::{Path, PathBuf},
};

use sternhalma_training::{
    state::{BestGenomeRecord, TrainingState},
    store::{self, StoreError, TrainingStore},
};

/// Keeps the training state and the best genome in two JSON files.
///
/// Files are replaced atomically: the new content goes to a sibling
/// temporary file first, which is then renamed over the old one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    state_path: PathBuf,
    best_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(state_path: PathBuf, best_path: PathBuf) -> Self {
        Self {
            state_path,
            best_path,
        }
    }
}

fn read(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StoreError::Io(err)),
    }
}

fn write_atomic(path: &Path, text: &str) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(StoreError::Io)?;
    }
    fs::write(&tmp, text).map_err(StoreError::Io)?;
    fs::rename(&tmp, path).map_err(StoreError::Io)
}

impl TrainingStore for JsonFileStore {
    fn load_state(&self) -> Result<Option<TrainingState>, StoreError> {
        read(&self.state_path)?.as_deref().map(store::decode).transpose()
    }

    fn save_state(&mut self, state: &TrainingState) -> Result<(), StoreError> {
        write_atomic(&self.state_path, &store::encode(state)?)
    }

    fn load_best(&self) -> Result<Option<BestGenomeRecord>, StoreError> {
        read(&self.best_path)?.as_deref().map(store::decode).transpose()
    }

    fn save_best(&mut self, best: &BestGenomeRecord) -> Result<(), StoreError> {
        write_atomic(&self.best_path, &store::encode(best)?)
    }
}
