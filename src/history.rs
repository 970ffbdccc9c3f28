use crate::error::{Result, SimpleGithubError};
use crate::models::HistoryEntry;
use crate::store::{default_data_dir, file_lock, lock_for_write, write_atomically};
use crate::types::Repository;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

const HISTORY_FILE: &str = "history.json";
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Repositories the user opened, most recent first.
///
/// Like [`AuthTokenStore`](crate::AuthTokenStore), writes to one file are
/// serialized across every instance in the process.
#[derive(Debug)]
pub struct SearchHistory {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SearchHistory {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(HISTORY_FILE);
        SearchHistory {
            write_lock: file_lock(&path),
            path,
        }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_data_dir()?))
    }

    fn load(&self) -> Result<Vec<HistoryEntry>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| {
            SimpleGithubError::Storage(format!("corrupt history file {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let raw = serde_json::to_vec(entries)
            .map_err(|e| SimpleGithubError::Storage(format!("failed to encode history: {}", e)))?;
        write_atomically(&self.path, &raw)
    }

    /// Record `repository` as the most recently viewed one.
    ///
    /// A repository that would not decode back is refused with `BadArgument`,
    /// so the file stays readable.
    pub fn add(&self, repository: &Repository) -> Result<()> {
        repository.validate()?;
        let _guard = lock_for_write(&self.write_lock, "history")?;

        let mut entries = self.load()?;
        entries.retain(|entry| entry.repository.full_name != repository.full_name);
        entries.insert(
            0,
            HistoryEntry {
                repository: repository.clone(),
                viewed_at: Utc::now(),
            },
        );
        entries.truncate(MAX_HISTORY_ENTRIES);
        self.save(&entries)?;

        debug!(repo = %repository.full_name, entries = entries.len(), "history updated");
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        self.load()
    }

    pub fn list(&self) -> Result<Vec<Repository>> {
        Ok(self.load()?.into_iter().map(|entry| entry.repository).collect())
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = lock_for_write(&self.write_lock, "history")?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
