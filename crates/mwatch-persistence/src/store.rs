//! State file load/save.

use crate::error::{PersistenceError, PersistenceResult};
use crate::schema::PersistedState;
use chrono::{DateTime, Utc};
use mwatch_core::TrackedState;
use mwatch_telemetry::Metrics;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// JSON file holding the full tracked state.
///
/// Shared between the main loop and the command poller; saves are
/// serialized because every save goes through the same temp file.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state. `None` means cold start; the reason is
    /// logged.
    pub fn load(&self, now: DateTime<Utc>) -> Option<TrackedState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No state file, starting cold");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read state file, starting cold");
                return None;
            }
        };

        let persisted: PersistedState = match serde_json::from_str(&raw) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file unreadable, starting cold");
                return None;
            }
        };

        if persisted.is_legacy() {
            info!(path = %self.path.display(), "Migrating legacy state file layout");
        }

        let state = persisted.into_tracked(now);
        info!(
            path = %self.path.display(),
            pairs = state.len(),
            "State restored"
        );
        Some(state)
    }

    /// Serialize the state as pretty JSON.
    pub fn to_json(state: &TrackedState) -> PersistenceResult<String> {
        Ok(serde_json::to_string_pretty(&PersistedState::from_tracked(
            state,
        ))?)
    }

    /// Write the full state: temp file in the same directory, fsync, rename.
    pub fn save(&self, state: &TrackedState) -> PersistenceResult<()> {
        let result = {
            let _guard = self.write_lock.lock();
            self.write_atomic(state)
        };
        Metrics::state_save(result.is_ok());
        match &result {
            Ok(()) => debug!(path = %self.path.display(), pairs = state.len(), "State saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "State save failed"),
        }
        result
    }

    fn write_atomic(&self, state: &TrackedState) -> PersistenceResult<()> {
        let json = Self::to_json(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| PersistenceError::InvalidPath(self.path.display().to_string()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
