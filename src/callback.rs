//! Diagnostic callback for storage failures that are recovered without surfacing to the caller.

use crate::persisted::PersistError;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};

pub(crate) type OnStorageErrorInner = Box<dyn FnMut(&PersistError) + Send>;

/// The callback executed whenever a read or write of persisted state fails, taking the
/// [`PersistError`] as an argument.
///
/// # Usage
/// ```
/// use persisted_notes::callback::OnStorageError;
///
/// let on_error = OnStorageError::from(|err: &persisted_notes::PersistError| {
///     eprintln!("notes were not saved: {err}");
/// });
/// ```
#[derive(Clone)]
pub struct OnStorageError(pub(crate) Arc<Mutex<OnStorageErrorInner>>);

impl OnStorageError {
    pub(crate) fn call(&self, error: &PersistError) {
        (self.0.lock())(error);
    }
}

impl<F> From<F> for OnStorageError
where
    F: FnMut(&PersistError) + Send + 'static,
{
    fn from(f: F) -> Self {
        OnStorageError(Arc::new(Mutex::new(Box::new(f))))
    }
}

impl fmt::Debug for OnStorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnStorageError(<callback>)")
    }
}
