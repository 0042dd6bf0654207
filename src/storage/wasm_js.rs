use super::{KeyValueStorage, StorageError};
#[cfg(all(feature = "tracing", target_family = "wasm"))]
use tracing::error;
use web_sys::Storage;

/// Implementation of [`KeyValueStorage`] backed by the browser's `window.localStorage`.
///
/// Outside a browser every call fails with [`StorageError::Unavailable`], so the same code can run
/// during server-side rendering or in native tests before a window exists.
#[derive(Debug, Default, Clone)]
pub struct LocalStorage {
    prefix: String,
}

impl LocalStorage {
    /// Creates a new instance of [`LocalStorage`] that uses keys as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new instance of [`LocalStorage`] that prepends `prefix` to every key.
    pub fn with_prefix<T>(prefix: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            prefix: prefix.into(),
        }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    #[cfg(target_family = "wasm")]
    fn get_local_storage(&self) -> Result<Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window in this context".to_string()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable(
                "LocalStorage not available".to_string(),
            )),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                error!("Could not find local storage: {_e:?}");
                Err(StorageError::Unavailable(
                    "LocalStorage access denied".to_string(),
                ))
            }
        }
    }

    #[cfg(not(target_family = "wasm"))]
    fn get_local_storage(&self) -> Result<Storage, StorageError> {
        Err(StorageError::Unavailable(
            "LocalStorage requires a browser environment".to_string(),
        ))
    }
}

impl KeyValueStorage for LocalStorage {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        let local_storage = self.get_local_storage()?;
        let key = self.prefixed(key);
        Ok(local_storage.get_item(&key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let local_storage = self.get_local_storage()?;
        let key = self.prefixed(key);
        local_storage.set_item(&key, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let local_storage = self.get_local_storage()?;
        let key = self.prefixed(key);
        local_storage.remove_item(&key)?;
        Ok(())
    }
}

#[cfg(all(test, not(target_family = "wasm")))]
mod tests {
    use super::*;

    #[test]
    fn local_storage_is_unavailable_outside_the_browser() {
        let mut storage = LocalStorage::new();
        assert!(storage.get("notes").unwrap_err().is_unavailable());
        assert!(storage.set("notes", "[]").unwrap_err().is_unavailable());
        assert!(storage.remove("notes").unwrap_err().is_unavailable());
    }
}
