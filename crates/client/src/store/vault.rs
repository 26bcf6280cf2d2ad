//! Persistence vault: one versioned blob of client state.
//!
//! Session, cart, and enrollment state are serialized together under a
//! single versioned root key. Payment state is excluded by construction -
//! it is simply not part of [`PersistedState`] - so a checkout attempt never
//! survives a restart. Logout removes the root key entirely.
//!
//! Storage is behind the [`StorageBackend`] trait so the host environment
//! decides where the blob lives: a JSON file for desktop shells,
//! [`MemoryBackend`] for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use coursedeck_core::{CourseId, CourseProgress};

use crate::api::types::{Course, User};
use crate::store::cart::CartItem;

/// Versioned root key the whole blob is stored under. Bump the suffix when
/// the persisted shape changes incompatibly; old blobs then hydrate as
/// empty state instead of failing.
pub const ROOT_KEY: &str = "coursedeck.state.v1";

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value blob storage.
///
/// Implementations store opaque strings; the vault owns the serialization.
pub trait StorageBackend: Send + Sync {
    /// Read the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the blob under `key`; removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: Mutex<HashMap<String, String>>,
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// File-per-key backend for desktop shells.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Store blobs as files under `dir` (created on first write).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

// =============================================================================
// Persisted shapes
// =============================================================================

/// Session record as persisted. The in-memory `Session` re-validates the
/// token on hydration.
#[derive(Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: User,
    pub token: String,
}

/// Enrollment mirror as persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub progress: HashMap<CourseId, CourseProgress>,
}

/// Everything the client persists, as one blob.
///
/// Checkout state is deliberately absent.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub session: Option<PersistedSession>,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default)]
    pub enrollment: EnrollmentSnapshot,
}

// =============================================================================
// StateVault
// =============================================================================

/// Serializes [`PersistedState`] in and out of a [`StorageBackend`].
#[derive(Clone)]
pub struct StateVault {
    backend: Arc<dyn StorageBackend>,
}

impl StateVault {
    /// Create a vault over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Vault over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    /// Load the persisted blob.
    ///
    /// An absent, unreadable, or corrupt blob yields default (empty) state;
    /// hydration never fails the application.
    #[must_use]
    pub fn load(&self) -> PersistedState {
        let raw = match self.backend.read(ROOT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PersistedState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted state; starting empty");
                return PersistedState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt persisted state; starting empty");
                PersistedState::default()
            }
        }
    }

    /// Write the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        let raw = serde_json::to_string(state)?;
        self.backend.write(ROOT_KEY, &raw)
    }

    /// Delete the blob. Called on logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn purge(&self) -> Result<(), StorageError> {
        self.backend.remove(ROOT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursedeck_core::{Role, UserId};
    use rust_decimal::Decimal;

    fn sample_state() -> PersistedState {
        PersistedState {
            session: Some(PersistedSession {
                user: User {
                    id: UserId::new("u-1"),
                    first_name: "Ada".to_owned(),
                    last_name: "Lovelace".to_owned(),
                    email: "ada@example.com".to_owned(),
                    role: Role::Student,
                    profile_picture: None,
                },
                token: "tok-1".to_owned(),
            }),
            cart: vec![CartItem {
                course_id: CourseId::new("c-1"),
                title: "Intro".to_owned(),
                price: Decimal::from(100),
                thumbnail: None,
                instructor_name: None,
            }],
            enrollment: EnrollmentSnapshot::default(),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let vault = StateVault::in_memory();
        vault.save(&sample_state()).expect("save");

        let loaded = vault.load();
        assert_eq!(
            loaded.session.map(|s| s.token),
            Some("tok-1".to_owned())
        );
        assert_eq!(loaded.cart.len(), 1);
    }

    #[test]
    fn test_missing_blob_loads_empty() {
        let vault = StateVault::in_memory();
        let loaded = vault.load();
        assert!(loaded.session.is_none());
        assert!(loaded.cart.is_empty());
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let backend = Arc::new(MemoryBackend::default());
        backend
            .write(ROOT_KEY, "{not valid json")
            .expect("seed corrupt blob");

        let vault = StateVault::new(backend);
        let loaded = vault.load();
        assert!(loaded.session.is_none());
    }

    #[test]
    fn test_purge_removes_blob() {
        let vault = StateVault::in_memory();
        vault.save(&sample_state()).expect("save");
        vault.purge().expect("purge");
        assert!(vault.load().session.is_none());
    }
}
