//! Key-value persistence for session credentials
//!
//! The session manager never touches a concrete storage medium. It goes
//! through [`KeyValueStore`], which has an in-memory implementation for
//! tests, a JSON file implementation for the CLI, and a null implementation
//! for contexts without persistent storage.

use crate::{CoreError, CoreResult, TokenPair};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Minimal string key-value capability
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// Store for contexts without persistent storage: reads are empty, writes are dropped
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl KeyValueStore for NullStore {
    fn get(&self, _key: &str) -> CoreResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> CoreResult<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> CoreResult<()> {
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> CoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| CoreError::storage_error("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> CoreResult<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;

        // Owner read/write only, the file holds bearer credentials
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)?;
        }

        Ok(())
    }

    fn update<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| CoreError::storage_error("file store lock poisoned"))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| CoreError::storage_error("file store lock poisoned"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Token persistence that keeps the access and refresh tokens in lockstep
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Token store over a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Current access token, if a complete pair is stored
    pub fn access_token(&self) -> Option<String> {
        self.load().map(|(access, _)| access)
    }

    /// Current refresh token, if a complete pair is stored
    pub fn refresh_token(&self) -> Option<String> {
        self.load().map(|(_, refresh)| refresh)
    }

    pub fn is_authenticated(&self) -> bool {
        self.load().is_some()
    }

    /// Persist both tokens. On a partial write nothing is left behind.
    pub fn save(&self, pair: &TokenPair) -> CoreResult<()> {
        let result = self
            .backend
            .set(ACCESS_TOKEN_KEY, &pair.access_token)
            .and_then(|()| self.backend.set(REFRESH_TOKEN_KEY, &pair.refresh_token));

        if let Err(err) = result {
            warn!("Failed to persist token pair: {err}");
            self.clear();
            return Err(err);
        }
        Ok(())
    }

    /// Remove both tokens. Failures are logged, never returned.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(err) = self.backend.remove(key) {
                warn!("Failed to remove {key} from token store: {err}");
            }
        }
    }

    fn load(&self) -> Option<(String, String)> {
        let access = self.read(ACCESS_TOKEN_KEY);
        let refresh = self.read(REFRESH_TOKEN_KEY);
        match (access, refresh) {
            (Some(access), Some(refresh)) => Some((access, refresh)),
            (None, None) => None,
            _ => {
                warn!("Token store holds half a token pair, discarding it");
                self.clear();
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!("Failed to read {key} from token store: {err}");
                None
            }
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

// Mock implementation for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub KeyValueStore {}

        impl KeyValueStore for KeyValueStore {
            fn get(&self, key: &str) -> CoreResult<Option<String>>;
            fn set(&self, key: &str, value: &str) -> CoreResult<()>;
            fn remove(&self, key: &str) -> CoreResult<()>;
        }
    }
}
