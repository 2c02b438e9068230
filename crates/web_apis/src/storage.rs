//! Web Storage (localStorage).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Default per-origin quota (5MB).
pub const DEFAULT_QUOTA: usize = 5 * 1024 * 1024;

/// Storage trait for key/value stores shaped like `window.localStorage`.
pub trait Storage: Send + Sync {
    /// Get the number of items in storage.
    fn length(&self) -> usize;

    /// Get the key at the given index.
    fn key(&self, index: usize) -> Option<String>;

    /// Get the value for the given key.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Set a value for the given key.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value for the given key.
    fn remove_item(&mut self, key: &str);

    /// Clear all items from storage.
    fn clear(&mut self);
}

/// Memory-backed storage implementation.
#[derive(Clone, Debug)]
pub struct MemoryStorage {
    data: HashMap<String, String>,
    keys: Vec<String>,
    quota: usize,
}

impl MemoryStorage {
    /// Create a new memory storage with the default quota.
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA)
    }

    /// Create with custom quota.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            data: HashMap::new(),
            keys: Vec::new(),
            quota,
        }
    }

    /// Current usage in bytes, not counting `skip`.
    fn usage_without(&self, skip: &str) -> usize {
        self.data
            .iter()
            .filter(|(k, _)| k.as_str() != skip)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn length(&self) -> usize {
        self.data.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.keys.get(index).cloned()
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // Replacing a value frees the old one first
        let new_size = self.usage_without(key) + key.len() + value.len();
        if new_size > self.quota {
            return Err(StorageError::QuotaExceeded);
        }

        if !self.data.contains_key(key) {
            self.keys.push(key.to_string());
        }

        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        self.data.remove(key);
        self.keys.retain(|k| k != key);
    }

    fn clear(&mut self) {
        self.data.clear();
        self.keys.clear();
    }
}

/// localStorage for a single origin.
///
/// Clones share the same underlying storage, the way every script on a page
/// sees one `localStorage` object.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    storage: Arc<RwLock<MemoryStorage>>,
    origin: String,
}

impl LocalStorage {
    /// Create a new localStorage for an origin.
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_storage(origin, MemoryStorage::new())
    }

    /// Create a localStorage backed by an existing memory storage.
    pub fn with_storage(origin: impl Into<String>, storage: MemoryStorage) -> Self {
        Self {
            storage: Arc::new(RwLock::new(storage)),
            origin: origin.into(),
        }
    }

    /// Get the origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl Storage for LocalStorage {
    fn length(&self) -> usize {
        self.storage.read().length()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.storage.read().key(index)
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.storage.read().get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.write().set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) {
        tracing::debug!("localStorage[{}]: remove {}", self.origin, key);
        self.storage.write().remove_item(key)
    }

    fn clear(&mut self) {
        self.storage.write().clear()
    }
}

/// Storage error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Quota exceeded")]
    QuotaExceeded,
}
