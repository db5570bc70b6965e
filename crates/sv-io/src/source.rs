//! # Record Sources
//!
//! The seam between scans and storage. A scan only ever asks a source for a
//! cursor at a position and pulls records from it one at a time; it never
//! sees how frames are stored.

use std::sync::Arc;

use sv_core::{Direction, TFPos};
use tokio::sync::watch;

use crate::error::Result;
use crate::record::RecordSlot;

/// Read-only access to the all-stream.
///
/// A source hands out any number of independent cursors. The log is
/// append-only, so cursors need no coordination with each other or with
/// writers beyond the head snapshot they take when opened.
pub trait RecordSource: Send + Sync {
    /// Position just past the last committed record.
    fn head(&self) -> TFPos;

    /// Open a cursor at `position`.
    ///
    /// Going forward, the first record yielded is the one starting at
    /// `position`. Going backward, it is the one ending at `position`;
    /// [`TFPos::HEAD`] or anything past the head starts at the head.
    fn open(&self, position: TFPos, direction: Direction) -> Result<Box<dyn RecordCursor + '_>>;

    /// Receiver that observes the head moving as records are appended.
    fn watch_head(&self) -> watch::Receiver<TFPos>;
}

/// A single-direction walk over physical records.
///
/// Not thread safe; confine each cursor to the task that opened it.
pub trait RecordCursor {
    /// Where the next call to [`next`](Self::next) will read from.
    fn position(&self) -> TFPos;

    /// The next physical record, or `None` once the end of the log (forward)
    /// or the origin (backward) is reached.
    fn next(&mut self) -> Result<Option<RecordSlot>>;

    /// Load the payload of a record this cursor yielded.
    fn payload(&mut self, slot: &RecordSlot) -> Result<Vec<u8>>;
}

impl<S: RecordSource + ?Sized> RecordSource for Arc<S> {
    fn head(&self) -> TFPos {
        (**self).head()
    }

    fn open(&self, position: TFPos, direction: Direction) -> Result<Box<dyn RecordCursor + '_>> {
        (**self).open(position, direction)
    }

    fn watch_head(&self) -> watch::Receiver<TFPos> {
        (**self).watch_head()
    }
}
