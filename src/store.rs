use crate::error::{Result, SimpleGithubError};
use crate::models::{Preferences, AUTH_TOKEN_KEY};
use std::collections::HashMap;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

const PREFERENCES_FILE: &str = "preferences.json";
const APP_DIR: &str = "simple-github";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);
static FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Process-wide write lock for `path`, shared by every store opened on it.
///
/// Paths are compared as given, so `dir/x` and `dir/./x` get separate locks.
pub(crate) fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    let locks = FILE_LOCKS.get_or_init(Default::default);
    let mut locks = locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    locks.entry(path.to_path_buf()).or_default().clone()
}

pub(crate) fn lock_for_write<'a>(lock: &'a Mutex<()>, what: &str) -> Result<MutexGuard<'a, ()>> {
    lock.lock()
        .map_err(|_| SimpleGithubError::Storage(format!("{} lock poisoned", what)))
}

/// Default data directory: `<platform config dir>/simple-github`.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| SimpleGithubError::Config("no configuration directory on this platform".to_string()))
}

/// Create `dir` and any missing parents, private to the current user on Unix.
///
/// Directories that already exist keep their permissions.
pub(crate) fn ensure_private_dir(dir: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(dir)?;
    Ok(())
}

/// Replace `path` with `contents` through a synced temporary file and a rename.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| SimpleGithubError::Storage(format!("{} has no parent directory", path.display())))?;
    ensure_private_dir(dir)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(PREFERENCES_FILE);
    let temp_path = dir.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    // Make the rename itself durable.
    #[cfg(unix)]
    fs::File::open(dir)?.sync_all()?;

    Ok(())
}

/// Single-slot store for the access token, kept in the application's
/// preferences file under the `auth_token` key.
///
/// Writers are serialized per file across the whole process, so two stores
/// opened on the same directory never drop each other's keys. Other
/// processes are not coordinated with.
#[derive(Debug)]
pub struct AuthTokenStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl AuthTokenStore {
    /// Store rooted at `data_dir`; nothing touches the disk until the first call.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(PREFERENCES_FILE);
        AuthTokenStore {
            write_lock: file_lock(&path),
            path,
        }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Preferences> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Preferences::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| {
            SimpleGithubError::Storage(format!("corrupt preferences file {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        let raw = serde_json::to_vec_pretty(prefs)
            .map_err(|e| SimpleGithubError::Storage(format!("failed to encode preferences: {}", e)))?;
        write_atomically(&self.path, &raw)
    }

    fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Preferences) -> bool,
    {
        let _guard = lock_for_write(&self.write_lock, "preferences")?;
        let mut prefs = self.load()?;
        if change(&mut prefs) {
            self.save(&prefs)?;
        }
        Ok(())
    }

    /// The stored token, or `None` if never written or cleared.
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.load()?.get_str(AUTH_TOKEN_KEY).map(str::to_string))
    }

    /// Replace the stored token. The value is on disk when this returns.
    pub fn update_token(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(SimpleGithubError::BadArgument(
                "refusing to store an empty token".to_string(),
            ));
        }
        self.update(|prefs| {
            prefs.set_str(AUTH_TOKEN_KEY, token);
            true
        })?;
        info!(path = %self.path.display(), "access token stored");
        Ok(())
    }

    pub fn clear_token(&self) -> Result<()> {
        self.update(|prefs| prefs.remove(AUTH_TOKEN_KEY))?;
        debug!(path = %self.path.display(), "access token cleared");
        Ok(())
    }

    pub fn has_token(&self) -> Result<bool> {
        Ok(self.token()?.is_some())
    }
}
