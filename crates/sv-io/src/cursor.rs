//! # Cursor — Frame Walker
//!
//! Walks encoded frames one at a time in either direction over any byte
//! store laid out as a journal. Tracks a single position: the offset the
//! next read starts from (forward) or ends at (backward).
//!
//! A cursor snapshots the head when opened and never reads past it, so
//! records appended mid-scan are picked up by the next cursor, not this one.

use sv_core::{decode_trailer, Direction, RecordHeader, TFPos, TRAILER_SIZE};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::record::{body_checksum, RecordSlot};
use crate::source::RecordCursor;

/// Byte storage holding frames back to back from offset 0.
pub(crate) trait FrameStore: Send + Sync {
    /// Run `f` over the store's bytes. Bytes at or past the head may be
    /// unwritten.
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R>;

    /// Offset just past the last committed frame.
    fn head_offset(&self) -> u64;
}

pub(crate) struct FrameCursor<'a, S> {
    store: &'a S,
    position: TFPos,
    direction: Direction,
    /// Head at the time the cursor was opened.
    limit: u64,
}

impl<'a, S: FrameStore> FrameCursor<'a, S> {
    pub(crate) fn open(store: &'a S, start: TFPos, direction: Direction) -> Self {
        let limit = store.head_offset();
        let position = match direction {
            Direction::Forward => start,
            Direction::Backward if start.commit_position > limit => TFPos::at(limit),
            Direction::Backward => start,
        };
        Self {
            store,
            position,
            direction,
            limit,
        }
    }
}

impl<S: FrameStore> RecordCursor for FrameCursor<'_, S> {
    fn position(&self) -> TFPos {
        self.position
    }

    fn next(&mut self) -> Result<Option<RecordSlot>> {
        let offset = self.position.commit_position;
        let limit = self.limit;
        let slot = match self.direction {
            Direction::Forward => {
                if offset >= limit {
                    return Ok(None);
                }
                self.store
                    .with_bytes(|bytes| decode_forward(bytes, offset, limit))??
            }
            Direction::Backward => {
                if offset == 0 {
                    return Ok(None);
                }
                self.store
                    .with_bytes(|bytes| decode_backward(bytes, offset, limit))??
            }
        };
        tracing::trace!(position = %slot.position, stream = %slot.stream_id, "read frame");
        self.position = slot.resume;
        Ok(Some(slot))
    }

    fn payload(&mut self, slot: &RecordSlot) -> Result<Vec<u8>> {
        let start = slot.payload_offset();
        let end = start + slot.payload_len as u64;
        if end > self.limit {
            return Err(Error::decode(slot.position, "payload runs past the head"));
        }
        self.store
            .with_bytes(|bytes| bytes[start as usize..end as usize].to_vec())
    }
}

/// Decode the frame starting at `offset`.
fn decode_forward(bytes: &[u8], offset: u64, limit: u64) -> Result<RecordSlot> {
    let position = TFPos::at(offset);
    let window = bytes
        .get(offset as usize..limit as usize)
        .ok_or_else(|| Error::decode(position, "position lies outside the log"))?;
    let header = RecordHeader::decode(window).map_err(|e| Error::decode(position, e))?;

    if header.log_position != offset {
        return Err(Error::decode(
            position,
            format!(
                "frame was written at {}, not on a record boundary",
                TFPos::at(header.log_position)
            ),
        ));
    }
    let frame_len = header.frame_len as usize;
    if frame_len > window.len() {
        return Err(Error::decode(position, "frame runs past the head"));
    }
    let frame = &window[..frame_len];
    let trailer = decode_trailer(frame).map_err(|e| Error::decode(position, e))?;
    if trailer != header.frame_len {
        return Err(Error::decode(
            position,
            format!("trailer length {} disagrees with header {}", trailer, header.frame_len),
        ));
    }

    let stream = &frame[header.stream_range()];
    let event_type = &frame[header.type_range()];
    let payload = &frame[header.payload_range()];
    if body_checksum(stream, event_type, payload) != header.checksum {
        return Err(Error::decode(position, "checksum mismatch"));
    }

    let stream_id = std::str::from_utf8(stream)
        .map_err(|e| Error::decode(position, format!("stream id is not UTF-8: {}", e)))?;
    let event_type = std::str::from_utf8(event_type)
        .map_err(|e| Error::decode(position, format!("event type is not UTF-8: {}", e)))?;

    Ok(RecordSlot {
        position,
        resume: TFPos::at(header.post_position()),
        event_id: Uuid::from_u128(header.event_id),
        stream_id: stream_id.to_string(),
        event_type: event_type.to_string(),
        payload_len: header.payload_len,
        flags: header.flags,
    })
}

/// Decode the frame ending at `end`.
fn decode_backward(bytes: &[u8], end: u64, limit: u64) -> Result<RecordSlot> {
    let position = TFPos::at(end);
    if (end as usize) < TRAILER_SIZE || end > limit || end as usize > bytes.len() {
        return Err(Error::decode(position, "position lies outside the log"));
    }
    let frame_len = decode_trailer(&bytes[..end as usize]).map_err(|e| Error::decode(position, e))?;
    let start = end
        .checked_sub(frame_len as u64)
        .ok_or_else(|| Error::decode(position, "trailer points before the origin"))?;

    let mut slot = decode_forward(bytes, start, limit)?;
    if slot.resume != position {
        return Err(Error::decode(position, "not on a record boundary"));
    }
    slot.resume = slot.position;
    Ok(slot)
}
