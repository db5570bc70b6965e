//! Error types for reads over the all-stream.

use std::fmt::Display;

use sv_core::TFPos;
use sv_filter::FilterError;
use thiserror::Error;

/// Everything that can go wrong between building a filter and handing back
/// a page.
///
/// "No match in this window" is never an error: it is an empty page with a
/// continuation position.
#[derive(Debug, Error)]
pub enum Error {
    /// The filter could not be built. Raised before any scanning starts.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    /// Scan or append parameters out of range.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A physical record could not be decoded. Fatal to the scan that hit it.
    #[error("Failed to decode record at {position}: {reason}")]
    Decode { position: TFPos, reason: String },

    /// The caller cancelled the scan or the wait for new records.
    #[error("Scan cancelled")]
    Cancelled,

    /// The underlying storage failed. Not retried here.
    #[error("Record source unavailable: {0}")]
    SourceUnavailable(#[from] std::io::Error),

    #[error("Journal full: record needs {needed} bytes, {available} available")]
    JournalFull { needed: u64, available: u64 },

    /// A subscription was closed by an earlier failure.
    #[error("Subscription closed after an earlier failure")]
    SubscriptionClosed,
}

impl Error {
    pub fn decode(position: TFPos, reason: impl Display) -> Self {
        Error::Decode {
            position,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        Error::SourceUnavailable(std::io::Error::other(format!("{} lock poisoned", what)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
