//! # sv-filter — The "Sieve" of SIEVE
//!
//! Predicates that decide which records of the all-stream a reader sees.
//!
//! A client describes a filter as one or more clauses, each naming a field
//! (`EventType` or `StreamId`), a matching kind (`Prefix` or `Regex`) and its
//! patterns. Clauses arrive as loose [`FilterRequest`]s, are validated into
//! [`FilterSpec`]s and compiled once into an [`EventFilter`]:
//!
//! ```text
//! FilterRequest ──validate──▶ FilterSpec ──EventFilter::new──▶ EventFilter
//!  (wire strings)            (typed clause)                 (compiled, OR-ed)
//! ```
//!
//! | Context     | Kind     | Allowed when                                   |
//! |-------------|----------|------------------------------------------------|
//! | `EventType` | `Prefix` | event type starts with any pattern             |
//! | `EventType` | `Regex`  | event type contains a match for the first one  |
//! | `StreamId`  | `Prefix` | stream id starts with any pattern              |
//! | `StreamId`  | `Regex`  | stream id contains a match for the first one   |

pub mod builder;
pub mod error;
pub mod filter;
pub mod model;
pub mod request;

pub use builder::{EventFilterBuilder, EXCLUDE_SYSTEM_EVENTS};
pub use error::FilterError;
pub use filter::EventFilter;
pub use model::{FilterContext, FilterKind, FilterSpec};
pub use request::{split_data, FilterData, FilterRequest};
