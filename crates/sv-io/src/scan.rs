//! # Filtered Scanner
//!
//! Reads one page of the all-stream through an [`EventFilter`], examining at
//! most `max_search_window` physical records no matter how few of them
//! match. A selective filter over a long log therefore costs a bounded
//! amount of work per call; the caller keeps going from `next_position`.
//!
//! ```text
//!  start                                   next_position
//!    │  examined (≤ window)                      │
//!    ▼                                           ▼
//!    [ ✗ ][ ✓ ][ ✗ ][ ✗ ][ ✓ ][ ✗ ] ... [ ✗ ][ ✓ ]│[ . ][ . ]
//!          └── page (≤ max_records) ────────────┘
//! ```
//!
//! A scan stops when the page is full, the window is used up, or the cursor
//! runs out of log. Only the last sets `is_end_of_stream`.

use sv_core::{Direction, TFPos};
use sv_filter::EventFilter;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::record::LogRecord;
use crate::source::RecordSource;

/// Parameters of one page read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    pub start: TFPos,
    pub direction: Direction,

    /// Most matching records to return.
    pub max_records: usize,

    /// Most physical records to examine.
    pub max_search_window: usize,
}

impl ScanRequest {
    pub fn forward(start: TFPos, max_records: usize, max_search_window: usize) -> Self {
        Self {
            start,
            direction: Direction::Forward,
            max_records,
            max_search_window,
        }
    }

    pub fn backward(start: TFPos, max_records: usize, max_search_window: usize) -> Self {
        Self {
            start,
            direction: Direction::Backward,
            max_records,
            max_search_window,
        }
    }

    /// Same request, continuing from `position`.
    pub fn resume_at(&self, position: TFPos) -> Self {
        Self {
            start: position,
            ..*self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_records == 0 {
            return Err(Error::InvalidRequest(
                "max_records must be at least 1".to_string(),
            ));
        }
        if self.max_search_window == 0 {
            return Err(Error::InvalidRequest(
                "max_search_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of matching records and where to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Matches in scan order: ascending positions forward, descending
    /// backward.
    pub records: Vec<LogRecord>,

    pub direction: Direction,

    /// Where this page actually started. Equal to the requested start except
    /// for backward reads from past the head, which start at the head.
    pub current_position: TFPos,

    /// Resume point for the next page in the same direction.
    pub next_position: TFPos,

    /// Resume point for a page in the opposite direction, covering the
    /// records before this one.
    pub prev_position: TFPos,

    /// The scan ran out of log before filling the page or the window.
    pub is_end_of_stream: bool,

    /// Physical records examined.
    pub examined: usize,
}

/// Read one page from `source` through `filter`.
///
/// `cancel` is checked before every physical record; a cancelled scan
/// returns [`Error::Cancelled`] and discards its partial page. A record that
/// fails to decode fails the whole call.
pub fn scan<S>(
    source: &S,
    request: &ScanRequest,
    filter: &EventFilter,
    cancel: &CancellationToken,
) -> Result<ScanResult>
where
    S: RecordSource + ?Sized,
{
    match scan_window(source, request, filter, cancel)? {
        (_, Some(failure)) => Err(failure),
        (page, None) => Ok(page),
    }
}

/// Like [`scan`], but a decode failure ends the page instead of discarding
/// it. The matches read before the bad record come back together with the
/// error, and `next_position` points at the bad record so the next window
/// meets it first.
pub(crate) fn scan_window<S>(
    source: &S,
    request: &ScanRequest,
    filter: &EventFilter,
    cancel: &CancellationToken,
) -> Result<(ScanResult, Option<Error>)>
where
    S: RecordSource + ?Sized,
{
    request.validate()?;

    let mut cursor = source.open(request.start, request.direction)?;
    let current_position = cursor.position();
    let mut records = Vec::new();
    let mut examined = 0usize;
    let mut failure = None;
    let mut failed_at = None;

    let is_end_of_stream = loop {
        if records.len() >= request.max_records || examined >= request.max_search_window {
            break false;
        }
        if cancel.is_cancelled() {
            tracing::debug!(
                start = %request.start,
                examined,
                at = %cursor.position(),
                "filtered scan cancelled"
            );
            return Err(Error::Cancelled);
        }

        let before = cursor.position();
        let slot = match cursor.next() {
            Ok(Some(slot)) => slot,
            Ok(None) => break true,
            Err(e @ Error::Decode { .. }) => {
                failure = Some(e);
                failed_at = Some(before);
                break false;
            }
            Err(e) => return Err(e),
        };
        examined += 1;

        if filter.is_allowed(&slot.stream_id, &slot.event_type) {
            match cursor.payload(&slot) {
                Ok(data) => records.push(slot.into_record(data)),
                Err(e @ Error::Decode { .. }) => {
                    failure = Some(e);
                    failed_at = Some(before);
                    break false;
                }
                Err(e) => return Err(e),
            }
        }
    };

    let next_position = failed_at.unwrap_or_else(|| cursor.position());
    tracing::debug!(
        start = %current_position,
        direction = %request.direction,
        filter = %filter,
        matched = records.len(),
        examined,
        next = %next_position,
        end_of_stream = is_end_of_stream,
        failed = failure.is_some(),
        "filtered scan finished"
    );

    let page = ScanResult {
        records,
        direction: request.direction,
        current_position,
        next_position,
        prev_position: current_position,
        is_end_of_stream,
        examined,
    };
    Ok((page, failure))
}

/// Read every matching record from `request.start` to the end of the log in
/// the request's direction, one window-bounded page at a time.
pub fn scan_to_end<S>(
    source: &S,
    request: &ScanRequest,
    filter: &EventFilter,
    cancel: &CancellationToken,
) -> Result<Vec<LogRecord>>
where
    S: RecordSource + ?Sized,
{
    let mut out = Vec::new();
    let mut page_request = *request;
    loop {
        let page = scan(source, &page_request, filter, cancel)?;
        out.extend(page.records);
        if page.is_end_of_stream {
            return Ok(out);
        }
        page_request = page_request.resume_at(page.next_position);
    }
}
