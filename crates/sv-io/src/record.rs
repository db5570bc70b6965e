//! # Records
//!
//! The three shapes a record takes on its way through a read:
//!
//! - [`EventData`]: what a writer hands to `append`.
//! - [`RecordSlot`]: what a cursor yields per physical record, only the
//!   fields a filter needs plus positions.
//! - [`LogRecord`]: a matched record with its payload loaded.

use crc32fast::Hasher;
use sv_core::{FrameError, RecordHeader, TFPos, FLAG_JSON, HEADER_SIZE, TRAILER_SIZE};
use uuid::Uuid;

/// An event to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub event_id: Uuid,
    pub stream_id: String,
    pub event_type: String,
    pub data: Vec<u8>,
    pub is_json: bool,
}

impl EventData {
    pub fn new(
        stream_id: impl Into<String>,
        event_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            stream_id: stream_id.into(),
            event_type: event_type.into(),
            data: data.into(),
            is_json: false,
        }
    }

    pub fn json(
        stream_id: impl Into<String>,
        event_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            is_json: true,
            ..Self::new(stream_id, event_type, data)
        }
    }

    fn flags(&self) -> u16 {
        if self.is_json {
            FLAG_JSON
        } else {
            0
        }
    }

    /// Encode this event as a complete frame to be written at `offset`.
    pub fn encode_frame(&self, offset: u64) -> Result<Vec<u8>, FrameError> {
        let stream = self.stream_id.as_bytes();
        let event_type = self.event_type.as_bytes();
        let header = RecordHeader::new(
            offset,
            self.event_id.as_u128(),
            stream.len(),
            event_type.len(),
            self.data.len(),
            body_checksum(stream, event_type, &self.data),
            self.flags(),
        )?;

        let mut frame = Vec::with_capacity(header.frame_len as usize);
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(stream);
        frame.extend_from_slice(event_type);
        frame.extend_from_slice(&self.data);
        frame.extend_from_slice(&header.frame_len.to_le_bytes());
        Ok(frame)
    }
}

/// One physical record as seen by a scan, before its payload is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSlot {
    /// Where the record starts.
    pub position: TFPos,

    /// Where a scan in the same direction continues after this record:
    /// the end of the frame going forward, its start going backward.
    pub resume: TFPos,

    pub event_id: Uuid,
    pub stream_id: String,
    pub event_type: String,
    pub payload_len: u32,
    pub flags: u16,
}

impl RecordSlot {
    pub fn is_json(&self) -> bool {
        (self.flags & FLAG_JSON) != 0
    }

    /// Byte offset of the payload within the log.
    pub(crate) fn payload_offset(&self) -> u64 {
        self.position.commit_position
            + (HEADER_SIZE + self.stream_id.len() + self.event_type.len()) as u64
    }

    pub fn into_record(self, data: Vec<u8>) -> LogRecord {
        LogRecord {
            position: self.position,
            event_id: self.event_id,
            stream_id: self.stream_id,
            event_type: self.event_type,
            data,
            flags: self.flags,
        }
    }
}

/// A record returned by a read, payload included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub position: TFPos,
    pub event_id: Uuid,
    pub stream_id: String,
    pub event_type: String,
    pub data: Vec<u8>,
    pub flags: u16,
}

impl LogRecord {
    pub fn is_json(&self) -> bool {
        (self.flags & FLAG_JSON) != 0
    }
}

/// Bytes an encoded event occupies in the log.
pub fn encoded_len(event: &EventData) -> Result<u64, FrameError> {
    sv_core::frame_len(
        event.stream_id.len(),
        event.event_type.len(),
        event.data.len(),
    )
    .map(u64::from)
}

pub(crate) fn body_checksum(stream: &[u8], event_type: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(stream);
    hasher.update(event_type);
    hasher.update(payload);
    hasher.finalize()
}

/// Frame overhead besides the names and payload.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + TRAILER_SIZE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_frame_has_header_and_trailer() {
        let event = EventData::new("ES1", "event-type", b"abc".to_vec());
        let frame = event.encode_frame(0).unwrap();
        assert_eq!(frame.len(), FRAME_OVERHEAD + 3 + 10 + 3);
        assert_eq!(frame.len() as u64, encoded_len(&event).unwrap());

        let header = RecordHeader::decode(&frame).unwrap();
        assert_eq!(header.log_position, 0);
        assert_eq!(header.event_id, event.event_id.as_u128());
        assert_eq!(&frame[header.stream_range()], b"ES1");
        assert_eq!(&frame[header.type_range()], b"event-type");
        assert_eq!(&frame[header.payload_range()], b"abc");
        assert_eq!(
            sv_core::decode_trailer(&frame).unwrap(),
            header.frame_len
        );
    }

    #[test]
    fn test_json_flag_is_carried() {
        let event = EventData::json("s", "t", b"{}".to_vec());
        let frame = event.encode_frame(64).unwrap();
        let header = RecordHeader::decode(&frame).unwrap();
        assert!(header.is_json());
        assert_eq!(header.log_position, 64);
    }

    #[test]
    fn test_checksum_covers_all_body_fields() {
        let a = body_checksum(b"s", b"t", b"p");
        assert_ne!(a, body_checksum(b"s", b"t", b"q"));
        assert_ne!(a, body_checksum(b"x", b"t", b"p"));
    }

    #[test]
    fn test_payload_offset_skips_header_and_names() {
        let slot = RecordSlot {
            position: TFPos::at(100),
            resume: TFPos::at(200),
            event_id: Uuid::nil(),
            stream_id: "abc".into(),
            event_type: "de".into(),
            payload_len: 10,
            flags: 0,
        };
        assert_eq!(slot.payload_offset(), 100 + 48 + 5);
    }
}
