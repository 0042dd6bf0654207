//! Note records and the transient draft used to compose or edit them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a [`Note`], unique within a collection and never reused.
///
/// Serializes as a bare integer.
#[derive(
    Serialize, Deserialize, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user-authored note as it is stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

impl Note {
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// The notes a collection starts with before anything has been stored.
pub fn seed_notes() -> Vec<Note> {
    vec![
        Note::new(1, "Grociery", "All Grociery Items"),
        Note::new(
            2,
            "Meeting Notes",
            "Discuss new project timeline, assign tasks to team",
        ),
        Note::new(
            3,
            "Idea for App",
            "Develop a note-taking app with a clean and minimalist design",
        ),
    ]
}

/// Whether the draft composes a new note or targets an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing(NoteId),
}

/// The in-progress form. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    editing: Option<NoteId>,
}

impl Draft {
    /// Creates a draft for a new note.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            editing: None,
        }
    }

    /// The id of the note being edited, if any.
    pub fn editing(&self) -> Option<NoteId> {
        self.editing
    }

    pub fn edit_state(&self) -> EditState {
        match self.editing {
            Some(id) => EditState::Editing(id),
            None => EditState::Idle,
        }
    }

    /// Both title and content contain something other than whitespace.
    ///
    /// A byte order mark counts as whitespace.
    pub fn is_valid(&self) -> bool {
        !is_blank(&self.title) && !is_blank(&self.content)
    }

    pub(crate) fn begin(&mut self, note: &Note) {
        self.title.clone_from(&note.title);
        self.content.clone_from(&note.content);
        self.editing = Some(note.id);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

fn is_blank(text: &str) -> bool {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
        .is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_tokens, Token};

    #[test]
    fn note_serializes_as_three_field_record() {
        let note = Note::new(1_700_000_000_000, "Title", "Body");
        assert_tokens(
            &note,
            &[
                Token::Struct {
                    name: "Note",
                    len: 3,
                },
                Token::Str("id"),
                Token::I64(1_700_000_000_000),
                Token::Str("title"),
                Token::Str("Title"),
                Token::Str("content"),
                Token::Str("Body"),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn note_id_is_a_bare_integer() {
        assert_tokens(&NoteId::new(3), &[Token::I64(3)]);
        let json = serde_json::to_string(&Note::new(3, "a", "b")).unwrap();
        assert_eq!(json, r#"{"id":3,"title":"a","content":"b"}"#);
    }

    #[test]
    fn seed_has_three_notes_with_ids_one_to_three() {
        let seed = seed_notes();
        let ids: Vec<i64> = seed.iter().map(|note| note.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(seed[1].title, "Meeting Notes");
    }

    #[test]
    fn draft_validation_trims_whitespace() {
        assert!(Draft::new("X", "Y").is_valid());
        assert!(!Draft::new("", "Y").is_valid());
        assert!(!Draft::new("   \t", "Y").is_valid());
        assert!(!Draft::new("X", "\n").is_valid());
    }

    #[test]
    fn byte_order_mark_counts_as_blank() {
        assert!(!Draft::new("\u{FEFF}", "Y").is_valid());
        assert!(!Draft::new("X", " \u{FEFF}\u{00A0}").is_valid());
        assert!(Draft::new("\u{FEFF}X", "Y").is_valid());
    }

    #[test]
    fn draft_edit_cycle() {
        let mut draft = Draft::default();
        assert_eq!(draft.edit_state(), EditState::Idle);

        draft.begin(&Note::new(2, "Meeting Notes", "Agenda"));
        assert_eq!(draft.edit_state(), EditState::Editing(NoteId::new(2)));
        assert_eq!(draft.title, "Meeting Notes");
        assert_eq!(draft.content, "Agenda");

        draft.clear();
        assert_eq!(draft, Draft::default());
    }
}
