use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Which field of a record a filter clause inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterContext {
    EventType,
    StreamId,
}

impl FilterContext {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            FilterContext::EventType => "EventType",
            FilterContext::StreamId => "StreamId",
        }
    }

    /// Pick this context's field out of a record's `(stream id, event type)`.
    #[inline]
    pub fn select<'a>(&self, stream_id: &'a str, event_type: &'a str) -> &'a str {
        match self {
            FilterContext::EventType => event_type,
            FilterContext::StreamId => stream_id,
        }
    }
}

impl FromStr for FilterContext {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eventtype" => Ok(FilterContext::EventType),
            "streamid" => Ok(FilterContext::StreamId),
            _ => Err(FilterError::InvalidContext(s.to_string())),
        }
    }
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// How a filter clause matches its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    /// Field starts with any of the patterns.
    Prefix,
    /// Field contains a match for the first pattern.
    Regex,
}

impl FilterKind {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            FilterKind::Prefix => "Prefix",
            FilterKind::Regex => "Regex",
        }
    }
}

impl FromStr for FilterKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prefix" => Ok(FilterKind::Prefix),
            "regex" => Ok(FilterKind::Regex),
            _ => Err(FilterError::InvalidKind(s.to_string())),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// One filter clause: a context, a matching kind and its patterns.
///
/// A `Prefix` clause may carry many alternative prefixes. A `Regex` clause
/// only ever compiles its first pattern; any further patterns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub context: FilterContext,
    pub kind: FilterKind,
    pub patterns: Vec<String>,
}

impl FilterSpec {
    pub fn new(context: FilterContext, kind: FilterKind, patterns: Vec<String>) -> Self {
        Self {
            context,
            kind,
            patterns,
        }
    }

    pub fn event_type_prefix<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            FilterContext::EventType,
            FilterKind::Prefix,
            prefixes.into_iter().map(Into::into).collect(),
        )
    }

    pub fn event_type_regex(pattern: impl Into<String>) -> Self {
        Self::new(
            FilterContext::EventType,
            FilterKind::Regex,
            vec![pattern.into()],
        )
    }

    pub fn stream_id_prefix<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            FilterContext::StreamId,
            FilterKind::Prefix,
            prefixes.into_iter().map(Into::into).collect(),
        )
    }

    pub fn stream_id_regex(pattern: impl Into<String>) -> Self {
        Self::new(
            FilterContext::StreamId,
            FilterKind::Regex,
            vec![pattern.into()],
        )
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            self.context,
            self.kind,
            self.patterns.join(", ")
        )
    }
}
