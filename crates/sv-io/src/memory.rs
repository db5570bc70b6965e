//! # In-Memory Log
//!
//! A [`RecordSource`] over a growable byte buffer. Frames are encoded
//! exactly as the [`Journal`](crate::journal::Journal) encodes them, so a
//! record gets the same position here as it would on disk.

use std::sync::RwLock;

use sv_core::{Direction, TFPos};
use tokio::sync::watch;

use crate::cursor::{FrameCursor, FrameStore};
use crate::error::{Error, Result};
use crate::record::EventData;
use crate::source::{RecordCursor, RecordSource};

pub struct MemoryLog {
    bytes: RwLock<Vec<u8>>,
    head_tx: watch::Sender<TFPos>,
}

impl MemoryLog {
    pub fn new() -> Self {
        let (head_tx, _) = watch::channel(TFPos::ZERO);
        Self {
            bytes: RwLock::new(Vec::new()),
            head_tx,
        }
    }

    /// A log holding `events` in order.
    pub fn with_events<'e>(events: impl IntoIterator<Item = &'e EventData>) -> Result<Self> {
        let log = Self::new();
        for event in events {
            log.append(event)?;
        }
        Ok(log)
    }

    pub fn append(&self, event: &EventData) -> Result<TFPos> {
        let mut bytes = self.bytes.write().map_err(|_| Error::poisoned("memory log"))?;
        let offset = bytes.len() as u64;
        let frame = event
            .encode_frame(offset)
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        bytes.extend_from_slice(&frame);
        let head = TFPos::at(bytes.len() as u64);
        drop(bytes);

        self.head_tx.send_replace(head);
        Ok(TFPos::at(offset))
    }

    /// Flip the bits of one stored byte.
    #[cfg(test)]
    pub(crate) fn corrupt_byte(&self, offset: u64) {
        let mut bytes = self.bytes.write().unwrap();
        bytes[offset as usize] ^= 0xFF;
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStore for MemoryLog {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let bytes = self.bytes.read().map_err(|_| Error::poisoned("memory log"))?;
        Ok(f(&bytes))
    }

    fn head_offset(&self) -> u64 {
        self.head_tx.borrow().commit_position
    }
}

impl RecordSource for MemoryLog {
    fn head(&self) -> TFPos {
        *self.head_tx.borrow()
    }

    fn open(&self, position: TFPos, direction: Direction) -> Result<Box<dyn RecordCursor + '_>> {
        Ok(Box::new(FrameCursor::open(self, position, direction)))
    }

    fn watch_head(&self) -> watch::Receiver<TFPos> {
        self.head_tx.subscribe()
    }
}
