use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use walker_core::Checkpoint;

use crate::persist::{parent_dir, AtomicFileWriter, PersistError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedCheckpoint {
    page: u32,
    next_row_index: usize,
}

/// Durable `(page, next_row_index)` cursor, overwritten in place.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the checkpoint, falling back to the first row of page 1 when the
    /// file is absent or unreadable. Already recorded categories are still
    /// skipped through the processed set, so a lost cursor costs time, not data.
    pub fn load(&self) -> Checkpoint {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                engine_info!("No checkpoint at {:?}; starting from page 1", self.path);
                return Checkpoint::default();
            }
            Err(err) => {
                engine_warn!("Failed to read checkpoint from {:?}: {}", self.path, err);
                return Checkpoint::default();
            }
        };

        match serde_json::from_str::<PersistedCheckpoint>(&content) {
            Ok(saved) => {
                let checkpoint = Checkpoint::new(saved.page, saved.next_row_index);
                engine_info!("Loaded checkpoint {} from {:?}", checkpoint, self.path);
                checkpoint
            }
            Err(err) => {
                engine_warn!("Failed to parse checkpoint from {:?}: {}", self.path, err);
                Checkpoint::default()
            }
        }
    }

    pub fn save(&self, checkpoint: Checkpoint) -> Result<(), PersistError> {
        let persisted = PersistedCheckpoint {
            page: checkpoint.page,
            next_row_index: checkpoint.next_row_index,
        };
        let content =
            serde_json::to_string(&persisted).map_err(|err| PersistError::Encode {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                PersistError::OutputDir(format!("bad checkpoint path {:?}", self.path))
            })?;
        AtomicFileWriter::new(parent_dir(&self.path)).write(filename, &content)?;
        engine_debug!("Checkpoint saved: {}", checkpoint);
        Ok(())
    }
}
