//! Persistence backends for the profile document

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use keypilot_errors::RepositoryError;
use keypilot_profile::Profile;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

/// Load/save backend for the whole profile collection.
///
/// The repository always writes the complete ordered collection; there is no
/// incremental write path.
pub trait ProfileStore: Send + Sync {
    /// Load the stored collection. A missing document is an empty collection.
    fn load(&self) -> Result<Vec<Profile>, RepositoryError>;

    /// Replace the stored collection.
    fn save(&self, profiles: &[Profile]) -> Result<(), RepositoryError>;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// Pretty-printed JSON document on disk, written atomically.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the document at `path`. Nothing is touched on disk
    /// until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the profile document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Path a document that failed to parse is moved to.
    pub fn quarantine_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    /// Write content to the document atomically
    ///
    /// # Error Recovery
    ///
    /// Uses atomic write pattern:
    /// 1. Write to temporary file and flush it to disk
    /// 2. Rename temp file to target
    /// 3. Original file is preserved if write fails
    fn write_atomic(&self, content: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                debug!(path = ?temp_path, error = %cleanup, "Failed to remove temp file");
            }
            return Err(e);
        }
        Ok(())
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Profile>, RepositoryError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "Profile document not found, starting empty");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| RepositoryError::load_failed(self.location(), e.to_string()))?;

        match serde_json::from_str::<Vec<Profile>>(&content) {
            Ok(profiles) => {
                debug!(path = ?self.path, count = profiles.len(), "Loaded profile document");
                Ok(profiles)
            }
            Err(parse_error) => {
                // Keep the user's data: move it aside so seeding cannot overwrite it.
                let quarantine = self.quarantine_path();
                match fs::rename(&self.path, &quarantine) {
                    Ok(()) => {
                        warn!(
                            path = ?self.path,
                            moved_to = ?quarantine,
                            error = %parse_error,
                            "Profile document is corrupt, moved aside"
                        );
                        Ok(Vec::new())
                    }
                    Err(rename_error) => {
                        error!(
                            path = ?self.path,
                            error = %rename_error,
                            "Could not move corrupt profile document aside"
                        );
                        Err(RepositoryError::load_failed(
                            self.location(),
                            format!("{parse_error} (and could not move it aside: {rename_error})"),
                        ))
                    }
                }
            }
        }
    }

    fn save(&self, profiles: &[Profile]) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(profiles)
            .map_err(|e| RepositoryError::persist_failed(self.location(), e.to_string()))?;

        self.write_atomic(&json)
            .map_err(|e| RepositoryError::persist_failed(self.location(), e.to_string()))?;

        debug!(path = ?self.path, count = profiles.len(), "Profile document written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store. Clones share the same contents, so a test can keep one
/// clone to inspect what the repository persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    profiles: Mutex<Vec<Profile>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `profiles`, as if loaded from disk.
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        let store = Self::default();
        *store.inner.profiles.lock() = profiles;
        store
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of the last persisted collection.
    pub fn persisted(&self) -> Vec<Profile> {
        self.inner.profiles.lock().clone()
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self) -> Result<Vec<Profile>, RepositoryError> {
        Ok(self.inner.profiles.lock().clone())
    }

    fn save(&self, profiles: &[Profile]) -> Result<(), RepositoryError> {
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::persist_failed(
                self.location(),
                "simulated write failure",
            ));
        }
        *self.inner.profiles.lock() = profiles.to_vec();
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
