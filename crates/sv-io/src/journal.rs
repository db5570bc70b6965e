//! # Journal — Memory-Mapped Append-Only Log
//!
//! The journal is a single pre-allocated file mapped into virtual memory via
//! `mmap`. Frames are written back to back from offset 0; the byte offset of
//! a frame is its log position. Space past the head is zero.
//!
//! ```text
//! [frame 0][frame 1] ... [frame n-1][0 0 0 0 ... ]
//! ^0                                ^head         ^size
//! ```
//!
//! An append writes the frame body and trailer first and the header last,
//! so a crash mid-append leaves a zero header that recovery treats as the
//! end of the log.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use memmap2::MmapMut;
use sv_core::{Direction, FrameError, RecordHeader, TFPos, HEADER_SIZE};
use tokio::sync::watch;

use crate::cursor::{FrameCursor, FrameStore};
use crate::error::{Error, Result};
use crate::record::EventData;
use crate::source::{RecordCursor, RecordSource};

/// Default journal size: 64 MiB.
pub const DEFAULT_JOURNAL_SIZE: u64 = 64 * 1024 * 1024;

/// The memory-mapped journal file.
///
/// Appends are serialized by an exclusive lock on the map; cursors take a
/// shared lock for the duration of one frame read.
pub struct Journal {
    /// The mutable memory map over the journal file.
    mmap: RwLock<MmapMut>,

    /// Total size of the journal in bytes.
    size: u64,

    /// Offset just past the last committed frame.
    head: AtomicU64,

    head_tx: watch::Sender<TFPos>,

    path: PathBuf,

    /// The backing file (kept open for the lifetime of the journal).
    _file: File,
}

impl Journal {
    /// Open (or create) a journal file at `path` with at least `size` bytes.
    ///
    /// An existing file larger than `size` keeps its length. The head is
    /// recovered by walking frames from the start.
    pub fn open(path: &Path, size: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = size.max(file.metadata()?.len());
        if size < HEADER_SIZE as u64 {
            return Err(Error::InvalidRequest(format!(
                "journal size {} is smaller than one record header",
                size
            )));
        }
        file.set_len(size)?;

        // SAFETY: the file stays open for the lifetime of the map and no
        // other process is expected to map it concurrently.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let head = recover_head(&mmap)?;
        tracing::info!(
            path = %path.display(),
            size,
            head = %TFPos::at(head),
            "journal opened"
        );

        let (head_tx, _) = watch::channel(TFPos::at(head));
        Ok(Self {
            mmap: RwLock::new(mmap),
            size,
            head: AtomicU64::new(head),
            head_tx,
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Append one event, returning the position it was written at.
    pub fn append(&self, event: &EventData) -> Result<TFPos> {
        let mut mmap = self.mmap.write().map_err(|_| Error::poisoned("journal"))?;
        let offset = self.head.load(Ordering::Acquire);
        let frame = event
            .encode_frame(offset)
            .map_err(|e: FrameError| Error::InvalidRequest(e.to_string()))?;

        let end = offset + frame.len() as u64;
        if end > self.size {
            return Err(Error::JournalFull {
                needed: frame.len() as u64,
                available: self.size - offset,
            });
        }

        let (start, end_usize) = (offset as usize, end as usize);
        mmap[start + HEADER_SIZE..end_usize].copy_from_slice(&frame[HEADER_SIZE..]);
        mmap[start..start + HEADER_SIZE].copy_from_slice(&frame[..HEADER_SIZE]);
        drop(mmap);

        self.head.store(end, Ordering::Release);
        self.head_tx.send_replace(TFPos::at(end));
        tracing::debug!(
            position = %TFPos::at(offset),
            stream = %event.stream_id,
            event_type = %event.event_type,
            "appended record"
        );
        Ok(TFPos::at(offset))
    }

    /// Append several events in order, returning their positions.
    pub fn append_all<'e>(&self, events: impl IntoIterator<Item = &'e EventData>) -> Result<Vec<TFPos>> {
        events.into_iter().map(|event| self.append(event)).collect()
    }

    /// Returns the total journal size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes left for new frames.
    #[inline]
    pub fn available(&self) -> u64 {
        self.size - self.head.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the mmap to disk.
    pub fn flush(&self) -> Result<()> {
        let mmap = self.mmap.read().map_err(|_| Error::poisoned("journal"))?;
        mmap.flush()?;
        Ok(())
    }
}

/// Walk frames from offset 0 until the first unwritten header.
fn recover_head(bytes: &[u8]) -> Result<u64> {
    let mut offset = 0usize;
    while offset + HEADER_SIZE <= bytes.len() {
        match RecordHeader::decode(&bytes[offset..]) {
            Ok(header) => {
                let end = offset + header.frame_len as usize;
                if header.log_position != offset as u64 || end > bytes.len() {
                    return Err(Error::decode(
                        TFPos::at(offset as u64),
                        "frame header does not fit the journal during recovery",
                    ));
                }
                offset = end;
            }
            Err(FrameError::Unwritten) => break,
            Err(e) => return Err(Error::decode(TFPos::at(offset as u64), e)),
        }
    }
    Ok(offset as u64)
}

impl FrameStore for Journal {
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let mmap = self.mmap.read().map_err(|_| Error::poisoned("journal"))?;
        Ok(f(&mmap[..]))
    }

    fn head_offset(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }
}

impl RecordSource for Journal {
    fn head(&self) -> TFPos {
        TFPos::at(self.head_offset())
    }

    fn open(&self, position: TFPos, direction: Direction) -> Result<Box<dyn RecordCursor + '_>> {
        Ok(Box::new(FrameCursor::open(self, position, direction)))
    }

    fn watch_head(&self) -> watch::Receiver<TFPos> {
        self.head_tx.subscribe()
    }
}
