//! A value mirrored into a [`KeyValueStorage`] slot.
//!
//! [`PersistedState`] has a two-phase lifecycle. [`PersistedState::new`] only knows the default
//! value and never touches storage, so it is safe to call before a browser environment exists.
//! [`PersistedState::attach`] hands it a backend, reads the stored value once and marks the state
//! as ready. From then on every mutation is written back synchronously.
//!
//! Storage problems never reach the caller. A missing store, a corrupted entry or a rejected
//! write is logged and passed to the optional [`OnStorageError`] callback, and the in-memory value
//! stays authoritative for the current session.

use crate::{
    callback::OnStorageError,
    storage::{KeyValueStorage, StorageError},
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
#[cfg(feature = "tracing")]
use tracing::{debug, error};

/// Failures reported by [`PersistedState`] through the diagnostic channel.
#[derive(Error, Debug)]
pub enum PersistError {
    /// There is no store in the current execution context.
    #[error("Storage unavailable for `{key}`: {source}")]
    StorageUnavailable {
        /// Storage key of the state.
        key: String,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },
    /// The store exists but reading from it failed.
    #[error("Could not read `{key}`: {source}")]
    Read {
        /// Storage key of the state.
        key: String,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },
    /// The stored entry exists but is not a valid encoding of the value.
    #[error("Could not decode stored `{key}`: {source}")]
    Deserialization {
        /// Storage key of the state.
        key: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The value could not be encoded.
    #[error("Could not encode `{key}`: {source}")]
    Serialization {
        /// Storage key of the state.
        key: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The store rejected a write or remove.
    #[error("Could not write `{key}`: {source}")]
    Write {
        /// Storage key of the state.
        key: String,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },
}

impl PersistError {
    /// The storage key the failure happened on.
    pub fn key(&self) -> &str {
        match self {
            PersistError::StorageUnavailable { key, .. }
            | PersistError::Read { key, .. }
            | PersistError::Deserialization { key, .. }
            | PersistError::Serialization { key, .. }
            | PersistError::Write { key, .. } => key,
        }
    }

    /// Returns `true` if the failure only means there is no store to talk to.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PersistError::StorageUnavailable { .. })
    }

    fn from_storage(key: &str, source: StorageError, write: bool) -> Self {
        let key = key.to_string();
        if source.is_unavailable() {
            PersistError::StorageUnavailable { key, source }
        } else if write {
            PersistError::Write { key, source }
        } else {
            PersistError::Read { key, source }
        }
    }
}

/// A value of type `T` kept in sync with the entry `key` of a storage backend `S`.
#[derive(Debug)]
pub struct PersistedState<T, S> {
    key: String,
    default: T,
    value: T,
    storage: Option<S>,
    ready: bool,
    on_error: Option<OnStorageError>,
}

impl<T, S> PersistedState<T, S>
where
    T: Serialize + DeserializeOwned + Clone,
    S: KeyValueStorage,
{
    /// Constructs a new [`PersistedState`] holding `default` and no storage.
    pub fn new(key: impl Into<String>, default: T) -> Self {
        Self {
            key: key.into(),
            value: default.clone(),
            default,
            storage: None,
            ready: false,
            on_error: None,
        }
    }

    /// Installs a callback that receives every storage failure.
    pub fn with_on_error(mut self, on_error: impl Into<OnStorageError>) -> Self {
        self.on_error = Some(on_error.into());
        self
    }

    /// Attaches `storage`, loads the stored value and marks the state as ready.
    ///
    /// Any value set before attaching is replaced by what the store holds, or by the default if
    /// the store has nothing usable.
    pub fn attach(&mut self, storage: S) {
        self.storage = Some(storage);
        self.refresh();
        self.ready = true;
    }

    /// Re-reads the stored value. Does nothing before [`attach`](Self::attach).
    pub fn refresh(&mut self) {
        if self.storage.is_none() {
            return;
        }
        self.value = match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                #[cfg(feature = "tracing")]
                debug!(key = %self.key, "No stored value, using default");
                self.default.clone()
            }
            Err(error) => {
                self.report(error);
                self.default.clone()
            }
        };
    }

    /// Returns `true` once the store has been consulted.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// The storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The fallback used when the store holds nothing usable.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// The attached backend, if any.
    pub fn storage(&self) -> Option<&S> {
        self.storage.as_ref()
    }

    /// Replaces the value and writes it to storage.
    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Err(error) = self.persist() {
            self.report(error);
        }
    }

    /// Computes the new value from the current one and writes it to storage.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let value = f(&self.value);
        self.set(value);
    }

    /// Removes the stored entry and goes back to the default value.
    pub fn clear(&mut self) {
        self.value = self.default.clone();
        let Some(storage) = self.storage.as_mut() else {
            return;
        };
        if let Err(source) = storage.remove(&self.key) {
            let error = PersistError::from_storage(&self.key, source, true);
            self.report(error);
        }
    }

    fn load(&mut self) -> Result<Option<T>, PersistError> {
        let Some(storage) = self.storage.as_mut() else {
            return Ok(None);
        };
        let raw = storage
            .get(&self.key)
            .map_err(|source| PersistError::from_storage(&self.key, source, false))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistError::Deserialization {
                key: self.key.clone(),
                source,
            })
    }

    fn persist(&mut self) -> Result<(), PersistError> {
        let Some(storage) = self.storage.as_mut() else {
            return Ok(());
        };
        let serialized =
            serde_json::to_string(&self.value).map_err(|source| PersistError::Serialization {
                key: self.key.clone(),
                source,
            })?;
        storage
            .set(&self.key, &serialized)
            .map_err(|source| PersistError::from_storage(&self.key, source, true))
    }

    fn report(&self, error: PersistError) {
        #[cfg(feature = "tracing")]
        {
            if error.is_unavailable() {
                debug!(key = %self.key, "{error}");
            } else {
                error!(key = %self.key, "{error}");
            }
        }
        if let Some(on_error) = &self.on_error {
            on_error.call(&error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CountingStorage, MemoryStorage};
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize, Serializer};
    use std::sync::Arc;

    fn recorder() -> (OnStorageError, Arc<Mutex<Vec<String>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let on_error = OnStorageError::from(move |err: &PersistError| {
            sink.lock().push(err.to_string());
        });
        (on_error, errors)
    }

    #[test]
    fn new_state_holds_default_and_is_not_ready() {
        let state: PersistedState<Vec<u32>, MemoryStorage> =
            PersistedState::new("numbers", vec![1, 2]);
        assert!(!state.is_ready());
        assert_eq!(state.get(), &vec![1, 2]);
        assert_eq!(state.key(), "numbers");
        assert!(state.storage().is_none());
    }

    #[test]
    fn attach_loads_stored_value() {
        let storage = MemoryStorage::new();
        storage.insert_raw("numbers", "[7,8,9]");
        let mut state = PersistedState::new("numbers", vec![1u32]);
        state.attach(storage);
        assert!(state.is_ready());
        assert_eq!(state.get(), &vec![7, 8, 9]);
    }

    #[test]
    fn attach_to_empty_store_keeps_default_without_writing() {
        let storage = MemoryStorage::new();
        let mut state = PersistedState::new("numbers", vec![1u32]);
        state.attach(storage.clone());
        assert!(state.is_ready());
        assert_eq!(state.get(), &vec![1]);
        assert!(storage.is_empty());
    }

    #[test]
    fn corrupted_entry_falls_back_to_default_and_reports() {
        let storage = MemoryStorage::new();
        storage.insert_raw("numbers", "{not json");
        let (on_error, errors) = recorder();
        let mut state = PersistedState::new("numbers", vec![1u32]).with_on_error(on_error);
        state.attach(storage);
        assert_eq!(state.get(), &vec![1]);
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Could not decode stored `numbers`"));
    }

    #[test]
    fn wrong_shape_falls_back_to_default() {
        let storage = MemoryStorage::new();
        storage.insert_raw("numbers", r#"{"id":1}"#);
        let mut state = PersistedState::new("numbers", vec![1u32]);
        state.attach(storage);
        assert_eq!(state.get(), &vec![1]);
    }

    #[test]
    fn unavailable_store_uses_default_and_stays_usable() {
        let (on_error, errors) = recorder();
        let mut state = PersistedState::new("numbers", vec![1u32]).with_on_error(on_error);
        state.attach(MemoryStorage::unavailable());
        assert!(state.is_ready());
        assert_eq!(state.get(), &vec![1]);

        state.update(|numbers| numbers.iter().map(|n| n * 10).collect());
        assert_eq!(state.get(), &vec![10]);

        let errors = errors.lock();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.starts_with("Storage unavailable for `numbers`")));
    }

    #[test]
    fn set_writes_every_update() {
        let storage = MemoryStorage::new();
        let mut state = PersistedState::new("numbers", Vec::<u32>::new());
        state.attach(storage.clone());
        state.set(vec![3]);
        assert_eq!(storage.raw("numbers"), Some("[3]".to_string()));
        state.update(|numbers| {
            let mut next = numbers.clone();
            next.push(4);
            next
        });
        assert_eq!(storage.raw("numbers"), Some("[3,4]".to_string()));
        assert_eq!(state.get(), &vec![3, 4]);
    }

    #[test]
    fn each_mutation_writes_exactly_once() {
        let storage = CountingStorage::new(MemoryStorage::new());
        let mut state = PersistedState::new("numbers", Vec::<u32>::new());
        state.set(vec![0]);
        assert_eq!(storage.writes(), 0);

        state.attach(storage.clone());
        assert_eq!(storage.writes(), 0);

        state.set(vec![1]);
        assert_eq!(storage.writes(), 1);
        state.update(|numbers| numbers.iter().map(|n| n + 1).collect());
        assert_eq!(storage.writes(), 2);
        state.set(vec![2]);
        assert_eq!(storage.writes(), 3);
        state.clear();
        assert_eq!(storage.writes(), 4);
    }

    #[test]
    fn failed_write_is_attempted_once() {
        let storage = CountingStorage::new(MemoryStorage::with_quota(4));
        let (on_error, errors) = recorder();
        let mut state = PersistedState::new("numbers", Vec::<u32>::new()).with_on_error(on_error);
        state.attach(storage.clone());
        state.set(vec![1, 2, 3]);
        assert_eq!(storage.writes(), 1);
        assert_eq!(errors.lock().len(), 1);
    }

    #[test]
    fn update_sees_latest_value() {
        let mut state = PersistedState::new("counter", 0u32);
        state.attach(MemoryStorage::new());
        for _ in 0..5 {
            state.update(|n| n + 1);
        }
        assert_eq!(*state.get(), 5);
    }

    #[test]
    fn rejected_write_keeps_memory_value() {
        let storage = MemoryStorage::with_quota(16);
        let (on_error, errors) = recorder();
        let mut state = PersistedState::new("numbers", Vec::<u32>::new()).with_on_error(on_error);
        state.attach(storage.clone());
        state.set(vec![1]);
        state.set(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(state.get(), &vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(storage.raw("numbers"), Some("[1]".to_string()));
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Could not write `numbers`"));
    }

    #[test]
    fn mutations_before_attach_stay_in_memory_and_are_replaced() {
        let storage = MemoryStorage::new();
        storage.insert_raw("numbers", "[5]");
        let mut state = PersistedState::new("numbers", vec![1u32]);
        state.set(vec![2]);
        assert_eq!(state.get(), &vec![2]);
        assert_eq!(storage.raw("numbers"), Some("[5]".to_string()));

        state.attach(storage);
        assert_eq!(state.get(), &vec![5]);
    }

    #[test]
    fn refresh_picks_up_external_writes() {
        let storage = MemoryStorage::new();
        let mut state = PersistedState::new("numbers", vec![1u32]);
        state.attach(storage.clone());
        storage.insert_raw("numbers", "[42]");
        assert_eq!(state.get(), &vec![1]);
        state.refresh();
        assert_eq!(state.get(), &vec![42]);
    }

    #[test]
    fn clear_removes_entry_and_restores_default() {
        let storage = MemoryStorage::new();
        let mut state = PersistedState::new("numbers", vec![1u32]);
        state.attach(storage.clone());
        state.set(vec![9]);
        state.clear();
        assert_eq!(state.get(), &vec![1]);
        assert_eq!(storage.raw("numbers"), None);
    }

    #[derive(Clone, Debug, Deserialize)]
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to encode"))
        }
    }

    #[test]
    fn serialization_failure_is_reported() {
        let storage = MemoryStorage::new();
        let (on_error, errors) = recorder();
        let mut state = PersistedState::new("value", Unencodable).with_on_error(on_error);
        state.attach(storage.clone());
        state.set(Unencodable);
        assert!(storage.is_empty());
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Could not encode `value`"));
    }

    #[test]
    fn persist_error_exposes_key_and_kind() {
        let err = PersistError::from_storage(
            "notes",
            StorageError::Unavailable("no window".into()),
            true,
        );
        assert!(err.is_unavailable());
        assert_eq!(err.key(), "notes");
        let err = PersistError::from_storage("notes", StorageError::WebSys("boom".into()), false);
        assert!(matches!(err, PersistError::Read { .. }));
        assert!(!err.is_unavailable());
        let err = PersistError::from_storage("notes", StorageError::WebSys("full".into()), true);
        assert!(matches!(err, PersistError::Write { .. }));
        assert!(!err.is_unavailable());
    }
}
