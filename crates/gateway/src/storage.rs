//! Durable key/value storage for client-side state.
//!
//! The session token and the local order index are both small string values
//! kept under fixed keys. [`FileStorage`] keeps them in one JSON document on
//! disk so they survive restarts; [`MemoryStorage`] keeps them for the
//! lifetime of the process.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{GatewayError, Result};

/// Key under which the session token is stored.
pub const SESSION_KEY: &str = "tradepost.session";

/// Key under which the local order index is stored.
pub const ORDER_INDEX_KEY: &str = "tradepost.order_ids";

const STATE_FILE: &str = "state.json";

/// One write lock per state file, shared by every handle in the process.
static WRITE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    Arc::clone(WRITE_LOCKS.lock().entry(path.to_path_buf()).or_default())
}

/// String key/value storage.
///
/// Implementations must make a `set` visible to every later `get` on any
/// handle sharing the same backing store.
pub trait Storage: Send + Sync {
    /// Read the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON file in a state directory.
///
/// Every read goes to disk, so values written by another process are seen
/// on the next read. Writes replace the file atomically: each one goes to
/// its own temporary sibling which is then renamed over the state file.
/// Handles on the same file within one process serialize their
/// read-modify-write cycles; separate processes do not coordinate and the
/// last writer wins.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStorage {
    /// Open (or lazily create) the state file inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| storage_error(dir, &e))?;
        let dir = fs::canonicalize(dir).map_err(|e| storage_error(dir, &e))?;
        let path = dir.join(STATE_FILE);
        Ok(Self {
            write_lock: write_lock_for(&path),
            path,
        })
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable state file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| GatewayError::Storage(e.to_string()))?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));

        let mut file = NamedTempFile::new_in(dir).map_err(|e| storage_error(dir, &e))?;
        file.write_all(body.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| storage_error(file.path(), &e))?;
        file.persist(&self.path)
            .map_err(|e| storage_error(&self.path, &e.error))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        apply(&mut entries);
        self.store(&entries)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> GatewayError {
    GatewayError::Storage(format!("{}: {err}", path.display()))
}
