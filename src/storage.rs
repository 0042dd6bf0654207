//! Key-value storage backends that [`PersistedState`](crate::PersistedState) writes through.
//!
//! Every backend stores plain strings under string keys. Values are opaque to the backend;
//! serialization happens one layer up.

use thiserror::Error;
use wasm_bindgen::JsValue;

pub mod memory;

#[cfg(feature = "native")]
pub mod file;
#[cfg(feature = "wasm-js")]
pub mod wasm_js;

#[cfg(feature = "native")]
pub use file::FileStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "wasm-js")]
pub use wasm_js::LocalStorage;

/// The error type for storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store does not exist in the current execution context.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// The backing store refused a write because it would exceed its capacity.
    #[error("Quota exceeded writing `{key}`: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        /// Key that was being written.
        key: String,
        /// Total size the store would have had after the write.
        needed: usize,
        /// Capacity of the store.
        limit: usize,
    },
    /// A JavaScript exception raised by the browser storage API.
    #[error("WebSys error: {0}")]
    WebSys(String),
    /// A filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Returns `true` if the error means there is no store at all, as opposed to a store that failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

impl From<JsValue> for StorageError {
    fn from(value: JsValue) -> Self {
        StorageError::WebSys(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

/// Trait for a synchronous string key-value store.
pub trait KeyValueStorage {
    /// Retrieves a stored value by key.
    ///
    /// # Returns
    /// * `Ok(Some(value))` if the key exists in storage
    /// * `Ok(None)` if the key does not exist
    /// * `Err(StorageError)` if the store could not be read
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a stored value by key. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Checks if a key exists in storage.
    fn contains_key(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Enum for selecting the storage backend at runtime.
#[derive(Debug, Clone)]
pub enum StorageType {
    /// Shared in-process storage.
    Memory(MemoryStorage),
    /// Browser `localStorage`.
    #[cfg(feature = "wasm-js")]
    LocalStorage(LocalStorage),
    /// One JSON file per key on disk.
    #[cfg(feature = "native")]
    File(FileStorage),
}

impl Default for StorageType {
    fn default() -> Self {
        #[cfg(feature = "wasm-js")]
        {
            StorageType::LocalStorage(LocalStorage::new())
        }
        #[cfg(not(feature = "wasm-js"))]
        {
            StorageType::Memory(MemoryStorage::new())
        }
    }
}

impl From<MemoryStorage> for StorageType {
    fn from(storage: MemoryStorage) -> Self {
        StorageType::Memory(storage)
    }
}

#[cfg(feature = "wasm-js")]
impl From<LocalStorage> for StorageType {
    fn from(storage: LocalStorage) -> Self {
        StorageType::LocalStorage(storage)
    }
}

#[cfg(feature = "native")]
impl From<FileStorage> for StorageType {
    fn from(storage: FileStorage) -> Self {
        StorageType::File(storage)
    }
}

impl KeyValueStorage for StorageType {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            StorageType::Memory(storage) => storage.get(key),
            #[cfg(feature = "wasm-js")]
            StorageType::LocalStorage(storage) => storage.get(key),
            #[cfg(feature = "native")]
            StorageType::File(storage) => storage.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            StorageType::Memory(storage) => storage.set(key, value),
            #[cfg(feature = "wasm-js")]
            StorageType::LocalStorage(storage) => storage.set(key, value),
            #[cfg(feature = "native")]
            StorageType::File(storage) => storage.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match self {
            StorageType::Memory(storage) => storage.remove(key),
            #[cfg(feature = "wasm-js")]
            StorageType::LocalStorage(storage) => storage.remove(key),
            #[cfg(feature = "native")]
            StorageType::File(storage) => storage.remove(key),
        }
    }
}

/// A backend wrapper that counts writes and removes, shared across clones.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct CountingStorage<S> {
    inner: S,
    writes: std::rc::Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl<S> CountingStorage<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Default::default(),
        }
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.get()
    }
}

#[cfg(test)]
impl<S: KeyValueStorage> KeyValueStorage for CountingStorage<S> {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.set(self.writes.get() + 1);
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.writes.set(self.writes.get() + 1);
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_storage_counts_sets_and_removes_only() {
        let shared = MemoryStorage::new();
        let counter = CountingStorage::new(shared.clone());
        let mut storage = counter.clone();
        storage.set("a", "1").unwrap();
        storage.get("a").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(counter.writes(), 2);
        assert!(shared.is_empty());
    }

    #[test]
    fn storage_type_dispatches_to_memory() {
        let shared = MemoryStorage::new();
        let mut storage = StorageType::from(shared.clone());
        storage.set("test", "value").unwrap();
        assert_eq!(storage.get("test").unwrap(), Some("value".to_string()));
        assert!(shared.clone().contains_key("test").unwrap());
        storage.remove("test").unwrap();
        assert_eq!(shared.clone().get("test").unwrap(), None);
    }

    #[test]
    fn boxed_storage_forwards_calls() {
        let mut storage: Box<dyn KeyValueStorage> = Box::new(MemoryStorage::new());
        assert!(!storage.contains_key("test").unwrap());
        storage.set("test", "value").unwrap();
        assert!(storage.contains_key("test").unwrap());
    }

    #[test]
    fn unavailable_is_distinguished_from_other_failures() {
        assert!(StorageError::Unavailable("no window".into()).is_unavailable());
        let quota = StorageError::QuotaExceeded {
            key: "notes".into(),
            needed: 10,
            limit: 5,
        };
        assert!(!quota.is_unavailable());
        assert_eq!(
            quota.to_string(),
            "Quota exceeded writing `notes`: 10 bytes needed, limit is 5"
        );
    }
}
