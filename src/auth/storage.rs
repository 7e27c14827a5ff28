//! Durable key/value storage for session tokens
//!
//! The session is mirrored under two plain-text keys, [`ACCESS_TOKEN_KEY`]
//! and [`REFRESH_TOKEN_KEY`], so that a restart can rehydrate it without a
//! fresh login. Values are neither encrypted nor pruned on read.
//!
//! Three backends implement [`SessionStorage`]:
//!
//! - [`FileStorage`]    -- a JSON object on disk (the default)
//! - [`KeyringStorage`] -- one OS keyring entry per key
//! - [`MemoryStorage`]  -- a process-local map, used by tests and
//!   `--ephemeral`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use directories::ProjectDirs;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{CinearcError, Result};

/// Storage key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Storage key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Synchronous key/value persistence.
///
/// Implementations must treat removing an absent key as success.
pub trait SessionStorage: Send + Sync {
    /// Returns the stored value, or `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. A no-op when the key does not exist.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Opens the backend selected by `config`.
///
/// # Errors
///
/// Returns [`CinearcError::Storage`] when the file backend has no usable
/// location (no override and no platform data directory).
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn SessionStorage>> {
    let storage: Arc<dyn SessionStorage> = match config.backend {
        StorageBackend::File => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => FileStorage::default_path()?,
            };
            tracing::debug!(path = %path.display(), "Using file session storage");
            Arc::new(FileStorage::new(path))
        }
        StorageBackend::Keyring => {
            tracing::debug!(service = %config.keyring_service, "Using keyring session storage");
            Arc::new(KeyringStorage::new(config.keyring_service.clone()))
        }
        StorageBackend::Memory => {
            tracing::debug!("Using in-memory session storage");
            Arc::new(MemoryStorage::new())
        }
    };
    Ok(storage)
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use cinearc::auth::storage::{MemoryStorage, SessionStorage, ACCESS_TOKEN_KEY};
    ///
    /// let storage = MemoryStorage::with_entries([(ACCESS_TOKEN_KEY, "abc")]);
    /// assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    /// ```
    pub fn with_entries<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CinearcError {
    CinearcError::Storage("storage lock poisoned".to_string())
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Plain-text JSON object on disk, rewritten in full on every change.
///
/// A missing file reads as empty. Writes go to a sibling temp file that is
/// then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Creates a file store at `path`. The file is created on first write.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `session.json` in the platform data directory.
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "cinearc", "cinearc").ok_or_else(|| {
            CinearcError::Storage("Could not determine data directory".to_string())
        })?;
        Ok(proj_dirs.data_dir().join("session.json"))
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(CinearcError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))
            .into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create session storage directory")
                .map_err(|e| CinearcError::Storage(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)
            .context("Failed to write session storage")
            .map_err(|e| CinearcError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path)
            .context("Failed to replace session storage")
            .map_err(|e| CinearcError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeyringStorage
// ---------------------------------------------------------------------------

/// Stores each key as its own entry in the OS native keyring
/// (Keychain on macOS, Secret Service on Linux, Credential Manager on
/// Windows). The entry's service is the configured service name and its
/// user is the storage key.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    /// Creates an accessor namespaced under `service`.
    pub fn new(service: String) -> Self {
        Self { service }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, key).map_err(CinearcError::Keyring)?)
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CinearcError::Keyring(e).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(CinearcError::Keyring)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CinearcError::Keyring(e).into()),
        }
    }
}
