use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use newsroom_core::SeenStore;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state path {0} has no file name")]
    InvalidPath(PathBuf),
    #[error("cannot serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// The JSON file holding the seen store between runs.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state starts the run with an empty store.
    pub fn load(&self) -> SeenStore {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                engine_info!("no state at {}, starting empty", self.path.display());
                return SeenStore::new();
            }
            Err(err) => {
                engine_warn!("cannot read state {}: {err}", self.path.display());
                return SeenStore::new();
            }
        };
        match serde_json::from_slice::<SeenStore>(&raw) {
            Ok(store) => store,
            Err(err) => {
                engine_warn!("corrupt state {}, starting empty: {err}", self.path.display());
                SeenStore::new()
            }
        }
    }

    /// Rewrite the whole file atomically.
    pub fn flush(&self, store: &SeenStore) -> Result<(), StateError> {
        let (Some(dir), Some(name)) = (
            self.path.parent(),
            self.path.file_name().and_then(|n| n.to_str()),
        ) else {
            return Err(StateError::InvalidPath(self.path.clone()));
        };
        let mut json = serde_json::to_vec_pretty(store)?;
        json.push(b'\n');
        AtomicFileWriter::new(dir.to_path_buf()).write(name, &json)?;
        Ok(())
    }
}
