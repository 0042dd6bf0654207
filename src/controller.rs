//! The note collection and its draft/edit cycle.

use crate::{
    callback::OnStorageError,
    clock::{Clock, NoteIdGenerator},
    note::{seed_notes, Draft, EditState, Note, NoteId},
    persisted::PersistedState,
    storage::{KeyValueStorage, StorageType},
    DEFAULT_STORAGE_KEY,
};
use std::{mem, sync::Arc};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Options for [`NoteCollectionController::new`].
#[derive(Clone, Default, bon::Builder)]
pub struct NoteCollectionOptions {
    /// The storage key the notes are kept under. If not provided, `"notes"` will be used.
    #[builder(into)]
    pub storage_key: Option<String>,

    /// Notes shown until something has been stored. If not provided, [`seed_notes`] will be used.
    pub seed: Option<Vec<Note>>,

    /// Callback for storage failures. They are logged either way.
    #[builder(into)]
    pub on_storage_error: Option<OnStorageError>,

    /// Time source for new note ids. If not provided, the system clock will be used.
    pub clock: Option<Arc<dyn Clock>>,
}

/// Holds the ordered notes, mirrored to storage, and the transient draft.
///
/// Construction never touches storage. Call [`attach`](Self::attach) once the store is available
/// and check [`is_ready`](Self::is_ready) before presenting [`notes`](Self::notes), which show the
/// seed set until then.
#[derive(Debug)]
pub struct NoteCollectionController<S = StorageType> {
    notes: PersistedState<Vec<Note>, S>,
    draft: Draft,
    ids: NoteIdGenerator,
}

impl<S: KeyValueStorage> NoteCollectionController<S> {
    /// Constructs a new [`NoteCollectionController`] holding the seed notes.
    pub fn new(options: NoteCollectionOptions) -> Self {
        let key = options
            .storage_key
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());
        let seed = options.seed.unwrap_or_else(seed_notes);

        let mut notes = PersistedState::new(key, seed);
        if let Some(on_error) = options.on_storage_error {
            notes = notes.with_on_error(on_error);
        }

        let ids = options
            .clock
            .map(NoteIdGenerator::new)
            .unwrap_or_default();

        Self {
            notes,
            draft: Draft::default(),
            ids,
        }
    }

    /// Attaches `storage` and loads the stored notes.
    pub fn attach(&mut self, storage: S) {
        self.notes.attach(storage);
        #[cfg(feature = "tracing")]
        debug!(
            key = self.notes.key(),
            count = self.notes.get().len(),
            "Note collection ready"
        );
    }

    /// Returns `true` once the stored notes have been loaded.
    pub fn is_ready(&self) -> bool {
        self.notes.is_ready()
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.get()
    }

    pub fn storage_key(&self) -> &str {
        self.notes.key()
    }

    pub fn find(&self, id: NoteId) -> Option<&Note> {
        self.notes.get().iter().find(|note| note.id == id)
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Mutable access to the draft's title and content.
    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn edit_state(&self) -> EditState {
        self.draft.edit_state()
    }

    /// Adds the draft as a new note at the front of the collection and clears the draft.
    ///
    /// Does nothing and returns `None` if the title or content is blank.
    pub fn create_from_draft(&mut self) -> Option<NoteId> {
        if !self.draft.is_valid() {
            #[cfg(feature = "tracing")]
            debug!("Ignoring blank draft");
            return None;
        }

        let id = self.ids.next_id(self.notes.get());
        let note = Note {
            id,
            title: mem::take(&mut self.draft.title),
            content: mem::take(&mut self.draft.content),
        };
        self.notes.update(move |notes| {
            let mut next = Vec::with_capacity(notes.len() + 1);
            next.push(note);
            next.extend(notes.iter().cloned());
            next
        });
        self.draft.clear();
        Some(id)
    }

    /// Loads note `id` into the draft for editing. Returns `false` if there is no such note.
    pub fn begin_edit(&mut self, id: NoteId) -> bool {
        let Some(note) = self.notes.get().iter().find(|note| note.id == id) else {
            return false;
        };
        self.draft.begin(note);
        true
    }

    /// Writes the draft over the note being edited, keeping its id and position.
    ///
    /// The draft is cleared and editing ends whether or not anything was written, including when
    /// the draft is blank. Returns `true` if a note was replaced.
    pub fn commit_edit(&mut self) -> bool {
        let draft = mem::take(&mut self.draft);
        let Some(id) = draft.editing() else {
            return false;
        };
        if !draft.is_valid() {
            #[cfg(feature = "tracing")]
            debug!(%id, "Ignoring blank edit");
            return false;
        }
        if self.find(id).is_none() {
            #[cfg(feature = "tracing")]
            warn!(%id, "Discarding edit of a deleted note");
            return false;
        }

        self.notes.update(|notes| {
            notes
                .iter()
                .map(|note| {
                    if note.id == id {
                        Note {
                            id,
                            title: draft.title.clone(),
                            content: draft.content.clone(),
                        }
                    } else {
                        note.clone()
                    }
                })
                .collect()
        });
        true
    }

    /// Removes note `id`. Returns `false` if there is no such note.
    ///
    /// A draft editing that note is left as it is.
    pub fn delete_note(&mut self, id: NoteId) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.notes
            .update(|notes| notes.iter().filter(|note| note.id != id).cloned().collect());
        true
    }

    /// Creates a note from the draft when idle, or commits the edit when editing.
    ///
    /// Returns `true` if the collection changed.
    pub fn submit(&mut self) -> bool {
        match self.edit_state() {
            EditState::Idle => self.create_from_draft().is_some(),
            EditState::Editing(_) => self.commit_edit(),
        }
    }
}
