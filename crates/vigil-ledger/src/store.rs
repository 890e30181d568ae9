//! Durable storage for the ledger, the state snapshot, and alert settings.
//!
//! `DurableStore` is the persistence seam. Two implementations ship here:
//!
//! - `MemoryStore` keeps everything in a `Mutex` and can be told to fail
//!   writes, which is how persistence-failure paths are exercised.
//! - `JsonFileStore` writes one pretty-printed JSON document per concern
//!   into a directory, replacing each file via write-then-rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use vigil_contracts::{
    error::{VigilError, VigilResult},
    ledger::LedgerEntry,
    notify::AlertSettings,
    status::PersistedState,
};

const LEDGER_FILE: &str = "ledger.json";
const STATE_FILE: &str = "state.json";
const SETTINGS_FILE: &str = "settings.json";

/// Durable key-value storage for the monitor.
///
/// Entries are always stored and returned in chain order (oldest first).
pub trait DurableStore: Send + Sync {
    fn load_entries(&self) -> VigilResult<Vec<LedgerEntry>>;

    /// Replace the stored entry sequence with `entries`.
    fn save_entries(&self, entries: &[LedgerEntry]) -> VigilResult<()>;

    fn load_state(&self) -> VigilResult<Option<PersistedState>>;

    fn save_state(&self, state: &PersistedState) -> VigilResult<()>;

    fn load_settings(&self) -> VigilResult<Option<AlertSettings>>;

    fn save_settings(&self, settings: &AlertSettings) -> VigilResult<()>;
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryContents {
    entries: Vec<LedgerEntry>,
    state: Option<PersistedState>,
    settings: Option<AlertSettings>,
}

/// An in-process store. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<MemoryContents>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `save_*` call fails with `PersistenceFailure`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Mutate the stored entries directly, bypassing the ledger.
    pub fn tamper<F>(&self, f: F) -> VigilResult<()>
    where
        F: FnOnce(&mut Vec<LedgerEntry>),
    {
        let mut contents = self.lock()?;
        f(&mut contents.entries);
        Ok(())
    }

    fn lock(&self) -> VigilResult<std::sync::MutexGuard<'_, MemoryContents>> {
        self.contents.lock().map_err(|e| VigilError::PersistenceFailure {
            reason: format!("memory store lock poisoned: {}", e),
        })
    }

    fn check_writable(&self) -> VigilResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VigilError::PersistenceFailure {
                reason: "memory store is refusing writes".to_string(),
            });
        }
        Ok(())
    }
}

impl DurableStore for MemoryStore {
    fn load_entries(&self) -> VigilResult<Vec<LedgerEntry>> {
        Ok(self.lock()?.entries.clone())
    }

    fn save_entries(&self, entries: &[LedgerEntry]) -> VigilResult<()> {
        self.check_writable()?;
        self.lock()?.entries = entries.to_vec();
        Ok(())
    }

    fn load_state(&self) -> VigilResult<Option<PersistedState>> {
        Ok(self.lock()?.state.clone())
    }

    fn save_state(&self, state: &PersistedState) -> VigilResult<()> {
        self.check_writable()?;
        self.lock()?.state = Some(state.clone());
        Ok(())
    }

    fn load_settings(&self) -> VigilResult<Option<AlertSettings>> {
        Ok(self.lock()?.settings.clone())
    }

    fn save_settings(&self, settings: &AlertSettings) -> VigilResult<()> {
        self.check_writable()?;
        self.lock()?.settings = Some(settings.clone());
        Ok(())
    }
}

// ── JsonFileStore ─────────────────────────────────────────────────────────────

/// A directory of JSON documents: `ledger.json`, `state.json`,
/// `settings.json`. Missing files read as empty.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> VigilResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| VigilError::PersistenceFailure {
            reason: format!("failed to create store directory '{}': {}", dir.display(), e),
        })?;
        Ok(Self { dir })
    }

    /// Path of the ledger document.
    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> VigilResult<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| VigilError::PersistenceFailure {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        let value = serde_json::from_str(&raw).map_err(|e| VigilError::PersistenceFailure {
            reason: format!("failed to parse '{}': {}", path.display(), e),
        })?;
        Ok(Some(value))
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> VigilResult<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));

        let json = serde_json::to_vec_pretty(value).map_err(|e| VigilError::PersistenceFailure {
            reason: format!("failed to serialize '{}': {}", name, e),
        })?;
        fs::write(&tmp, json).map_err(|e| VigilError::PersistenceFailure {
            reason: format!("failed to write '{}': {}", tmp.display(), e),
        })?;
        fs::rename(&tmp, &path).map_err(|e| VigilError::PersistenceFailure {
            reason: format!("failed to replace '{}': {}", path.display(), e),
        })?;

        debug!(path = %path.display(), "store document written");
        Ok(())
    }
}

impl DurableStore for JsonFileStore {
    fn load_entries(&self) -> VigilResult<Vec<LedgerEntry>> {
        Ok(self.read(LEDGER_FILE)?.unwrap_or_default())
    }

    fn save_entries(&self, entries: &[LedgerEntry]) -> VigilResult<()> {
        self.write(LEDGER_FILE, entries)
    }

    fn load_state(&self) -> VigilResult<Option<PersistedState>> {
        self.read(STATE_FILE)
    }

    fn save_state(&self, state: &PersistedState) -> VigilResult<()> {
        self.write(STATE_FILE, state)
    }

    fn load_settings(&self) -> VigilResult<Option<AlertSettings>> {
        self.read(SETTINGS_FILE)
    }

    fn save_settings(&self, settings: &AlertSettings) -> VigilResult<()> {
        self.write(SETTINGS_FILE, settings)
    }
}
