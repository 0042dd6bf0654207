//! Time source and id assignment for new notes.

use crate::note::{Note, NoteId};
use std::{collections::HashSet, fmt, sync::Arc};
#[cfg(feature = "tracing")]
use tracing::warn;

/// A source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

impl<F> Clock for F
where
    F: Fn() -> i64,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

/// The system clock. Uses `wasm_timer` on wasm targets, where `std::time::SystemTime` panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        #[cfg(not(target_family = "wasm"))]
        use std::time::{SystemTime, UNIX_EPOCH};
        #[cfg(target_family = "wasm")]
        use wasm_timer::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
            .unwrap_or(0)
    }
}

/// Hands out note ids derived from the current time.
///
/// An id is the current time in milliseconds unless that would not be larger than every id seen
/// so far, in which case it is one more than the largest. Two notes created in the same
/// millisecond therefore still get distinct ids, and ids keep growing if the clock steps back.
///
/// Once `i64::MAX` is taken there is nothing larger left, and the smallest positive id not in use
/// is handed out instead.
#[derive(Clone)]
pub struct NoteIdGenerator {
    clock: Arc<dyn Clock>,
    last: Option<NoteId>,
}

impl NoteIdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, last: None }
    }

    /// Returns an id larger than any id in `existing` and any id issued before.
    pub fn next_id<'a, I>(&mut self, existing: I) -> NoteId
    where
        I: IntoIterator<Item = &'a Note>,
    {
        let taken: HashSet<NoteId> = existing
            .into_iter()
            .map(|note| note.id)
            .chain(self.last)
            .collect();
        let now = self.clock.now_millis();
        let id = match taken.iter().max() {
            Some(floor) if now <= floor.get() => match floor.get().checked_add(1) {
                Some(next) => NoteId::new(next),
                None => {
                    let id = Self::lowest_free(&taken);
                    #[cfg(feature = "tracing")]
                    warn!(%id, "Note ids exhausted at i64::MAX, reusing a free slot");
                    id
                }
            },
            _ => NoteId::new(now),
        };
        self.last = Some(id);
        id
    }

    fn lowest_free(taken: &HashSet<NoteId>) -> NoteId {
        (1..)
            .map(NoteId::new)
            .find(|id| !taken.contains(id))
            .unwrap_or_default()
    }
}

impl Default for NoteIdGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for NoteIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteIdGenerator")
            .field("last", &self.last)
            .finish()
    }
}
