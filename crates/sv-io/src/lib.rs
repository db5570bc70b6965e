//! # sv-io — The "Engine" of SIEVE
//!
//! Storage and reading of the all-stream. Records live in a memory-mapped
//! journal as self-delimiting frames; cursors walk those frames in either
//! direction and the filtered scanner pages through them under a bounded
//! search window.
//!
//! | Module | Role |
//! |--------|------|
//! | [`journal`] | mmap-backed append-only log |
//! | [`memory`] | the same log in a `Vec<u8>` |
//! | [`source`] | cursor contract between storage and scans |
//! | [`scan`] | window-bounded filtered page reads |
//! | [`subscription`] | live filtered tail with checkpoints |

mod cursor;
pub mod error;
pub mod journal;
pub mod memory;
pub mod record;
pub mod scan;
pub mod source;
pub mod subscription;

pub use error::{Error, Result};
pub use journal::{Journal, DEFAULT_JOURNAL_SIZE};
pub use memory::MemoryLog;
pub use record::{EventData, LogRecord, RecordSlot};
pub use scan::{scan, scan_to_end, ScanRequest, ScanResult};
pub use source::{RecordCursor, RecordSource};
pub use subscription::{DecodePolicy, FilteredSubscription, SubscriptionItem, SubscriptionOptions};
