use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use radar_types::CheckpointState;
use tracing::{debug, warn};

use crate::error::CollectResult;

/// Where collection progress lives between runs. Writers always hand over a
/// complete state; implementations replace the stored one as a whole.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> CollectResult<CheckpointState>;
    fn save(&self, state: &CheckpointState) -> CollectResult<()>;

    /// Read-modify-write helper used by the collectors.
    fn update(&self, f: &mut dyn FnMut(&mut CheckpointState)) -> CollectResult<CheckpointState> {
        let mut state = self.load()?;
        f(&mut state);
        self.save(&state)?;
        Ok(state)
    }
}

/// JSON document on disk, replaced via write-to-temp-then-rename.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> CollectResult<CheckpointState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CheckpointState::default())
            }
            Err(e) => return Err(e.into()),
        };

        // A corrupt checkpoint only costs progress, never the run.
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(
                    "⚠️  Ignoring unreadable checkpoint {}: {}",
                    self.path.display(),
                    e
                );
                Ok(CheckpointState::default())
            }
        }
    }

    fn save(&self, state: &CheckpointState) -> CollectResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("💾 Checkpoint saved to {}", self.path.display());
        Ok(())
    }
}

/// Record that the run stopped early. Called when the cancel flag is seen.
pub fn mark_interrupted(store: &dyn CheckpointStore) -> CollectResult<CheckpointState> {
    store.update(&mut |state| {
        state.interrupted = true;
        state.last_run = Some(Utc::now());
    })
}
