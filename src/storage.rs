//! Persisted-session bindings.
//!
//! DESIGN
//! ======
//! The store writes the session after each sign-in or refresh and clears it
//! on logout. It reads it exactly once at startup via
//! `SessionStore::rehydrate`. The format is a single JSON document.
//!
//! TRADE-OFFS
//! ==========
//! The trait is synchronous and the store calls it inline from its async
//! operations. `JsonFileStorage` therefore blocks the calling worker for one
//! small read, write, or rename. In exchange, every write lands in the same
//! order as the state change that caused it, and a save can never overtake
//! the clear of a later logout.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::types::PersistedSession;

/// Storage binding that survives reloads.
pub trait SessionStorage: Send + Sync {
    /// Read the persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read or decoded.
    fn load(&self) -> Result<Option<PersistedSession>, StorageError>;

    /// Replace the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;

    /// Remove any persisted session. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be modified.
    fn clear(&self) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded storage, as if a previous run had persisted `session`.
    #[must_use]
    pub fn with_session(session: PersistedSession) -> Self {
        Self { slot: Mutex::new(Some(session)) }
    }

    /// Snapshot the stored value without going through `load`.
    #[must_use]
    pub fn peek(&self) -> Option<PersistedSession> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        Ok(self.peek())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        Ok(())
    }
}

// =============================================================================
// JSON FILE
// =============================================================================

/// One JSON file holding the persisted session.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
