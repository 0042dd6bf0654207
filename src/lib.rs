//! A note collection for single-user front ends, kept in sync with a key-value store.
//!
//! The crate is built around [`PersistedState`], a value mirrored into one slot of a
//! [`KeyValueStorage`] backend. It can be constructed before any store exists (for example during
//! server-side rendering) and attached once the browser's `localStorage` is reachable. Storage
//! failures are logged and reported to an optional callback; they never reach the caller, and the
//! in-memory value stays authoritative for the session.
//!
//! [`NoteCollectionController`] builds the note list, draft form and edit cycle on top of it.
//!
//! # Examples
//!
//! ```rust
//! use persisted_notes::{
//!     storage::MemoryStorage, EditState, NoteCollectionController, NoteCollectionOptions,
//! };
//!
//! let mut notes: NoteCollectionController<MemoryStorage> =
//!     NoteCollectionController::new(NoteCollectionOptions::default());
//! assert!(!notes.is_ready());
//!
//! notes.attach(MemoryStorage::new());
//! assert!(notes.is_ready());
//! assert_eq!(notes.notes().len(), 3);
//!
//! let draft = notes.draft_mut();
//! draft.title = "Groceries".to_string();
//! draft.content = "Milk, eggs".to_string();
//! let id = notes.create_from_draft().unwrap();
//! assert_eq!(notes.notes()[0].id, id);
//! assert_eq!(notes.edit_state(), EditState::Idle);
//! ```

pub mod callback;
pub mod clock;
pub mod controller;
pub mod note;
pub mod persisted;
pub mod storage;

pub use callback::OnStorageError;
pub use clock::{Clock, NoteIdGenerator, SystemClock};
pub use controller::{NoteCollectionController, NoteCollectionOptions};
pub use note::{seed_notes, Draft, EditState, Note, NoteId};
pub use persisted::{PersistError, PersistedState};
pub use storage::{KeyValueStorage, StorageError, StorageType};

/// The storage key notes are kept under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "notes";
