//! # Record Frames
//!
//! Physical layout of one record in the journal:
//!
//! ```text
//! [RecordHeader: 48 bytes][stream id][event type][payload][frame_len: u32]
//! ```
//!
//! The leading header carries `frame_len` so a forward reader can hop to the
//! next frame; the trailing copy lets a backward reader standing at the end
//! of a frame find its start. Every integer is little-endian.

use core::fmt;
use core::ops::Range;

/// `"SVLR"` read as a little-endian `u32`.
pub const RECORD_MAGIC: u32 = u32::from_le_bytes(*b"SVLR");

/// Encoded size of [`RecordHeader`].
pub const HEADER_SIZE: usize = 48;

/// Encoded size of the trailing frame length.
pub const TRAILER_SIZE: usize = 4;

/// Payload is JSON.
pub const FLAG_JSON: u16 = 0x1;

/// Fixed header at the start of every frame.
///
/// # Memory Layout (48 bytes, C ABI)
///
/// | Offset | Size | Field          |
/// |--------|------|----------------|
/// | 0      | 4    | `magic`        |
/// | 4      | 4    | `frame_len`    |
/// | 8      | 8    | `log_position` |
/// | 16     | 16   | `event_id`     |
/// | 32     | 4    | `payload_len`  |
/// | 36     | 4    | `checksum`     |
/// | 40     | 2    | `stream_len`   |
/// | 42     | 2    | `type_len`     |
/// | 44     | 2    | `flags`        |
/// | 46     | 2    | `reserved`     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
#[repr(C)]
pub struct RecordHeader {
    pub magic: u32,

    /// Total frame size including header and trailer.
    pub frame_len: u32,

    /// Byte offset the frame was written at. A mismatch on read means the
    /// reader is not standing on a frame boundary.
    pub log_position: u64,

    /// Identity of the event, unique across the log.
    pub event_id: u128,

    pub payload_len: u32,

    /// CRC32 over stream id, event type and payload bytes.
    pub checksum: u32,

    pub stream_len: u16,
    pub type_len: u16,
    pub flags: u16,
    pub reserved: u16,
}

/// Why a run of bytes is not a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the frame needs.
    Truncated { needed: usize, available: usize },
    /// Header space was never written (all zero magic).
    Unwritten,
    /// Magic is neither ours nor zero.
    BadMagic(u32),
    /// Declared frame length disagrees with the field lengths.
    LengthMismatch { declared: u32, computed: u64 },
    /// A name or payload is too long to encode.
    TooLarge { field: &'static str, len: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Truncated { needed, available } => write!(
                f,
                "truncated frame: needed {} bytes, {} available",
                needed, available
            ),
            FrameError::Unwritten => f.write_str("no frame written at this offset"),
            FrameError::BadMagic(magic) => write!(f, "bad frame magic {:#010x}", magic),
            FrameError::LengthMismatch { declared, computed } => write!(
                f,
                "frame length {} does not match field lengths ({})",
                declared, computed
            ),
            FrameError::TooLarge { field, len } => {
                write!(f, "{} of {} bytes is too large for a frame", field, len)
            }
        }
    }
}

impl core::error::Error for FrameError {}

/// Frame size for the given field lengths, or `TooLarge` if any field or the
/// whole frame overflows its encoding.
pub fn frame_len(stream_len: usize, type_len: usize, payload_len: usize) -> Result<u32, FrameError> {
    if stream_len > u16::MAX as usize {
        return Err(FrameError::TooLarge {
            field: "stream id",
            len: stream_len,
        });
    }
    if type_len > u16::MAX as usize {
        return Err(FrameError::TooLarge {
            field: "event type",
            len: type_len,
        });
    }
    let total = (HEADER_SIZE + TRAILER_SIZE) as u64
        + stream_len as u64
        + type_len as u64
        + payload_len as u64;
    u32::try_from(total).map_err(|_| FrameError::TooLarge {
        field: "payload",
        len: payload_len,
    })
}

impl RecordHeader {
    /// Build the header for a frame written at `log_position`.
    pub fn new(
        log_position: u64,
        event_id: u128,
        stream_len: usize,
        type_len: usize,
        payload_len: usize,
        checksum: u32,
        flags: u16,
    ) -> Result<Self, FrameError> {
        let frame_len = frame_len(stream_len, type_len, payload_len)?;
        Ok(Self {
            magic: RECORD_MAGIC,
            frame_len,
            log_position,
            event_id,
            payload_len: payload_len as u32,
            checksum,
            stream_len: stream_len as u16,
            type_len: type_len as u16,
            flags,
            reserved: 0,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.frame_len.to_le_bytes());
        out[8..16].copy_from_slice(&self.log_position.to_le_bytes());
        out[16..32].copy_from_slice(&self.event_id.to_le_bytes());
        out[32..36].copy_from_slice(&self.payload_len.to_le_bytes());
        out[36..40].copy_from_slice(&self.checksum.to_le_bytes());
        out[40..42].copy_from_slice(&self.stream_len.to_le_bytes());
        out[42..44].copy_from_slice(&self.type_len.to_le_bytes());
        out[44..46].copy_from_slice(&self.flags.to_le_bytes());
        out[46..48].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }

    /// Decode and sanity-check a header from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let magic = read_u32(bytes, 0);
        if magic == 0 {
            return Err(FrameError::Unwritten);
        }
        if magic != RECORD_MAGIC {
            return Err(FrameError::BadMagic(magic));
        }

        let header = Self {
            magic,
            frame_len: read_u32(bytes, 4),
            log_position: read_u64(bytes, 8),
            event_id: u128::from_le_bytes(take::<16>(bytes, 16)),
            payload_len: read_u32(bytes, 32),
            checksum: read_u32(bytes, 36),
            stream_len: u16::from_le_bytes(take::<2>(bytes, 40)),
            type_len: u16::from_le_bytes(take::<2>(bytes, 42)),
            flags: u16::from_le_bytes(take::<2>(bytes, 44)),
            reserved: u16::from_le_bytes(take::<2>(bytes, 46)),
        };

        let computed = (HEADER_SIZE + TRAILER_SIZE) as u64
            + header.stream_len as u64
            + header.type_len as u64
            + header.payload_len as u64;
        if computed != header.frame_len as u64 {
            return Err(FrameError::LengthMismatch {
                declared: header.frame_len,
                computed,
            });
        }
        Ok(header)
    }

    /// Byte range of the stream id, relative to the frame start.
    #[inline]
    pub fn stream_range(&self) -> Range<usize> {
        let start = HEADER_SIZE;
        start..start + self.stream_len as usize
    }

    /// Byte range of the event type, relative to the frame start.
    #[inline]
    pub fn type_range(&self) -> Range<usize> {
        let start = self.stream_range().end;
        start..start + self.type_len as usize
    }

    /// Byte range of the payload, relative to the frame start.
    #[inline]
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.type_range().end;
        start..start + self.payload_len as usize
    }

    /// Byte range of the trailing length, relative to the frame start.
    #[inline]
    pub fn trailer_range(&self) -> Range<usize> {
        let start = self.payload_range().end;
        start..start + TRAILER_SIZE
    }

    /// Offset just past this frame.
    #[inline]
    pub fn post_position(&self) -> u64 {
        self.log_position + self.frame_len as u64
    }

    #[inline]
    pub fn is_json(&self) -> bool {
        (self.flags & FLAG_JSON) != 0
    }

    #[inline]
    pub const fn size_bytes() -> usize {
        core::mem::size_of::<Self>()
    }
}

/// Read the trailing frame length that ends at `bytes.len()`.
pub fn decode_trailer(bytes: &[u8]) -> Result<u32, FrameError> {
    if bytes.len() < TRAILER_SIZE {
        return Err(FrameError::Truncated {
            needed: TRAILER_SIZE,
            available: bytes.len(),
        });
    }
    Ok(read_u32(bytes, bytes.len() - TRAILER_SIZE))
}

#[inline]
fn take<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(take::<4>(bytes, at))
}

#[inline]
fn read_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(take::<8>(bytes, at))
}
