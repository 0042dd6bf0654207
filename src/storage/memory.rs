//! In-process storage shared between handles.
//!
//! Cloning a [`MemoryStorage`] yields another handle onto the same entries, which lets a second
//! [`PersistedState`](crate::PersistedState) observe what the first one wrote, the same way two page
//! loads observe the same `localStorage`.

use super::{KeyValueStorage, StorageError};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, String>,
    quota: Option<usize>,
    unavailable: bool,
}

impl Inner {
    fn size_with(&self, key: &str, value: &str) -> usize {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value.len()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable(
                "Memory storage is disabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Implementation of [`KeyValueStorage`] that keeps entries in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStorage {
    /// Creates a new, empty [`MemoryStorage`] without a size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty [`MemoryStorage`] that rejects writes once keys and values together
    /// would exceed `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        let storage = Self::new();
        storage.inner.borrow_mut().quota = Some(limit);
        storage
    }

    /// Creates a handle on which every operation fails with [`StorageError::Unavailable`].
    pub fn unavailable() -> Self {
        let storage = Self::new();
        storage.inner.borrow_mut().unavailable = true;
        storage
    }

    /// Writes a raw entry, bypassing the quota. Useful for seeding a store with existing data.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.into(), value.into());
    }

    /// Returns a copy of the raw entry stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        let inner = self.inner.borrow();
        inner.check_available()?;
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_available()?;
        if let Some(limit) = inner.quota {
            let needed = inner.size_with(key, value);
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_available()?;
        inner.entries.remove(key);
        Ok(())
    }
}
