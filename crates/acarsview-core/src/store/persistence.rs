//! Persistence port for small pieces of operator state.
//!
//! Each port instance owns one storage key. `load` returning `None` means the
//! key is absent (or unreadable), which callers treat as empty state.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub trait PersistencePort: Send + Sync {
    fn load(&self) -> Option<Vec<u8>>;
    fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// Stores the value as `<data_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(data_dir: &Path, key: &str) -> Self {
        Self {
            path: data_dir.join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistencePort for FilePersistence {
    fn load(&self) -> Option<Vec<u8>> {
        std::fs::read(&self.path).ok()
    }

    /// Write-to-temp-then-rename so a crash mid-write never leaves a torn file.
    fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_file = self.path.with_extension("json.tmp");
        std::fs::write(&temp_file, bytes)?;
        std::fs::rename(&temp_file, &self.path)?;
        Ok(())
    }
}

/// In-memory port. Clones share the same slot, so a test can keep a handle and
/// inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: Vec<u8>) -> Self {
        let port = Self::new();
        *port.slot.lock() = Some(bytes);
        port
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.slot.lock().clone()
    }

    /// Make every following `save` fail, as a full or missing disk would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl PersistencePort for MemoryPersistence {
    fn load(&self) -> Option<Vec<u8>> {
        self.contents()
    }

    fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(PersistenceError::Unavailable("writes disabled".to_string()));
        }
        *self.slot.lock() = Some(bytes.to_vec());
        Ok(())
    }
}
