//! Rendering a page as a feed: a table of records plus the navigation
//! links a client follows to page through the all-stream.
//!
//! ```text
//! first     /head/backward/{count}
//! last      /00000000000000000000000000000000/forward/{count}
//! next      /{next_position}/{direction}/{count}
//! previous  /{prev_position}/{reverse direction}/{count}
//! ```

use std::fmt;

use sv_core::{Direction, TFPos};
use sv_io::{LogRecord, ScanRequest, ScanResult};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Longest payload excerpt shown in a table cell.
const DATA_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLinks {
    pub this: String,
    pub first: String,
    pub last: String,
    pub next: String,
    pub previous: String,
}

fn link(position: TFPos, direction: Direction, count: usize) -> String {
    format!("/{}/{}/{}", position, direction, count)
}

impl FeedLinks {
    pub fn for_page(request: &ScanRequest, page: &ScanResult) -> Self {
        let count = request.max_records;
        Self {
            this: link(request.start, request.direction, count),
            first: link(TFPos::HEAD, Direction::Backward, count),
            last: link(TFPos::ZERO, Direction::Forward, count),
            next: link(page.next_position, page.direction, count),
            previous: link(page.prev_position, page.direction.reverse(), count),
        }
    }
}

impl fmt::Display for FeedLinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "self:     {}", self.this)?;
        writeln!(f, "first:    {}", self.first)?;
        writeln!(f, "last:     {}", self.last)?;
        writeln!(f, "next:     {}", self.next)?;
        write!(f, "previous: {}", self.previous)
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Stream")]
    stream: String,
    #[tabled(rename = "Type")]
    event_type: String,
    #[tabled(rename = "Data")]
    data: String,
}

impl From<&LogRecord> for RecordRow {
    fn from(record: &LogRecord) -> Self {
        Self {
            position: record.position.to_string(),
            stream: record.stream_id.clone(),
            event_type: record.event_type.clone(),
            data: preview(record),
        }
    }
}

/// Short text form of a payload. Non-JSON or non-UTF-8 payloads show their
/// size only.
pub fn preview(record: &LogRecord) -> String {
    if record.data.is_empty() {
        return String::new();
    }
    match std::str::from_utf8(&record.data) {
        Ok(text) if record.is_json() => {
            let mut out: String = text.chars().take(DATA_PREVIEW_CHARS).collect();
            if text.chars().count() > DATA_PREVIEW_CHARS {
                out.push('…');
            }
            out
        }
        _ => format!("<{} bytes>", record.data.len()),
    }
}

pub fn render_records(records: &[LogRecord]) -> String {
    let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// A record as one line of JSON, as printed by `follow`.
pub fn record_json(record: &LogRecord) -> serde_json::Value {
    let data = if record.is_json() {
        serde_json::from_slice(&record.data).unwrap_or(serde_json::Value::Null)
    } else {
        serde_json::Value::Null
    };
    serde_json::json!({
        "position": record.position.to_string(),
        "eventId": record.event_id.to_string(),
        "streamId": record.stream_id,
        "eventType": record.event_type,
        "isJson": record.is_json(),
        "data": data,
    })
}
