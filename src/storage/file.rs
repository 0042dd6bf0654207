//! File-based storage implementation for native environments.
//!
//! Each key is persisted as its own file, so a native build keeps notes between runs the same way
//! a browser build keeps them in `localStorage`.

use super::{KeyValueStorage, StorageError};
use std::{fs, io::ErrorKind, path::PathBuf};

const FILE_STORAGE_PREFIX: &str = "notes-";
const STORAGE_FILE_EXTENSION: &str = "json";

/// File-based storage backend that writes every value to `<directory>/notes-<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    /// Creates a new instance of [`FileStorage`].
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory where the storage files will be stored. It is created on the
    ///   first write if it does not exist.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory files are written to.
    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if self.directory.as_os_str().is_empty() {
            return Ok(()); // current directory
        }
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    fn file_path(&self, key: &str) -> PathBuf {
        let sanitized_key = sanitize_key(key);
        self.directory.join(format!(
            "{FILE_STORAGE_PREFIX}{sanitized_key}.{STORAGE_FILE_EXTENSION}"
        ))
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

impl KeyValueStorage for FileStorage {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.file_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_directory()?;
        fs::write(self.file_path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.file_path(key)) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from(e)),
        }
    }
}
