//! # Event Filter
//!
//! The compiled predicate a scan applies to every physical record it visits.

use std::fmt;

use regex::Regex;

use crate::error::FilterError;
use crate::model::{FilterContext, FilterKind, FilterSpec};
use crate::request::FilterRequest;

/// An immutable predicate over a record's `(stream id, event type)`.
///
/// Built once per read or subscription from zero or more [`FilterSpec`]
/// clauses, then reused for every record. Clauses combine with OR. No clause
/// keeps state between calls, so the same record always gets the same answer
/// and a filter can be shared across threads freely.
#[derive(Debug, Clone)]
pub struct EventFilter {
    strategy: Strategy,
}

#[derive(Debug, Clone)]
enum Strategy {
    AlwaysAllow,
    Prefix {
        context: FilterContext,
        prefixes: Vec<String>,
    },
    Regex {
        context: FilterContext,
        regex: Regex,
    },
    Any(Vec<Strategy>),
}

impl EventFilter {
    /// The filter used when a request carries none: every record passes.
    pub fn allow_all() -> Self {
        Self {
            strategy: Strategy::AlwaysAllow,
        }
    }

    /// Compile `specs` into one predicate.
    ///
    /// No clauses gives [`allow_all`](Self::allow_all). Fails on the first
    /// clause with no patterns or with a regex that does not compile, before
    /// any record is looked at.
    pub fn new(specs: &[FilterSpec]) -> Result<Self, FilterError> {
        let strategy = match specs {
            [] => Strategy::AlwaysAllow,
            [single] => Strategy::compile(single)?,
            many => Strategy::Any(
                many.iter()
                    .map(Strategy::compile)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(Self { strategy })
    }

    /// Validate wire requests and compile them.
    pub fn from_requests(requests: &[FilterRequest]) -> Result<Self, FilterError> {
        let specs = requests
            .iter()
            .map(FilterRequest::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&specs)
    }

    /// Whether a record with this stream id and event type passes.
    #[inline]
    pub fn is_allowed(&self, stream_id: &str, event_type: &str) -> bool {
        self.strategy.allows(stream_id, event_type)
    }

    pub fn is_allow_all(&self) -> bool {
        matches!(self.strategy, Strategy::AlwaysAllow)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl Strategy {
    fn compile(spec: &FilterSpec) -> Result<Self, FilterError> {
        let Some(first) = spec.patterns.first() else {
            return Err(FilterError::MissingData);
        };
        match spec.kind {
            FilterKind::Prefix => Ok(Strategy::Prefix {
                context: spec.context,
                prefixes: spec.patterns.clone(),
            }),
            FilterKind::Regex => {
                if spec.patterns.len() > 1 {
                    tracing::debug!(
                        context = %spec.context,
                        ignored = spec.patterns.len() - 1,
                        "regex clause uses only its first pattern"
                    );
                }
                let regex = Regex::new(first).map_err(|source| FilterError::InvalidRegex {
                    pattern: first.clone(),
                    source,
                })?;
                Ok(Strategy::Regex {
                    context: spec.context,
                    regex,
                })
            }
        }
    }

    fn allows(&self, stream_id: &str, event_type: &str) -> bool {
        match self {
            Strategy::AlwaysAllow => true,
            Strategy::Prefix { context, prefixes } => {
                let field = context.select(stream_id, event_type);
                prefixes.iter().any(|prefix| field.starts_with(prefix.as_str()))
            }
            Strategy::Regex { context, regex } => {
                regex.is_match(context.select(stream_id, event_type))
            }
            Strategy::Any(strategies) => strategies
                .iter()
                .any(|strategy| strategy.allows(stream_id, event_type)),
        }
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.strategy)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::AlwaysAllow => f.write_str("*"),
            Strategy::Prefix { context, prefixes } => {
                write!(f, "{} Prefix [{}]", context, prefixes.join(", "))
            }
            Strategy::Regex { context, regex } => {
                write!(f, "{} Regex /{}/", context, regex.as_str())
            }
            Strategy::Any(strategies) => {
                for (i, strategy) in strategies.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{}", strategy)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(specs: &[FilterSpec]) -> EventFilter {
        EventFilter::new(specs).unwrap()
    }

    #[test]
    fn test_no_specs_allows_everything() {
        let f = filter(&[]);
        assert!(f.is_allow_all());
        assert!(f.is_allowed("anything", "$system"));
        assert!(f.is_allowed("", ""));
    }

    #[test]
    fn test_event_type_prefix() {
        let f = filter(&[FilterSpec::event_type_prefix(["event-type"])]);
        assert!(f.is_allowed("ES1", "event-type"));
        assert!(f.is_allowed("ES1", "event-type-extra"));
        assert!(!f.is_allowed("ES1", "other-event-type"));
    }

    #[test]
    fn test_event_type_regex_is_not_anchored() {
        let f = filter(&[FilterSpec::event_type_regex("^.*other-event.*$")]);
        assert!(f.is_allowed("ES2", "other-event-type"));
        assert!(!f.is_allowed("ES1", "event-type"));

        let partial = filter(&[FilterSpec::event_type_regex("other")]);
        assert!(partial.is_allowed("ES2", "the-other-one"));
    }

    #[test]
    fn test_stream_id_prefix_with_several_prefixes() {
        let f = filter(&[FilterSpec::stream_id_prefix(["ES2", "order-"])]);
        assert!(f.is_allowed("ES2", "event-type"));
        assert!(f.is_allowed("order-17", "event-type"));
        assert!(!f.is_allowed("ES1", "ES2"));
    }

    #[test]
    fn test_stream_id_regex() {
        let f = filter(&[FilterSpec::stream_id_regex("^.*ES2.*$")]);
        assert!(f.is_allowed("ES2", "event-type"));
        assert!(!f.is_allowed("ES3", "ES2"));
    }

    #[test]
    fn test_regex_uses_only_first_pattern() {
        let spec = FilterSpec::new(
            FilterContext::StreamId,
            FilterKind::Regex,
            vec!["^ES1$".into(), "^ES2$".into()],
        );
        let f = filter(&[spec]);
        assert!(f.is_allowed("ES1", "t"));
        assert!(!f.is_allowed("ES2", "t"));
    }

    #[test]
    fn test_specs_combine_with_or() {
        let s1 = FilterSpec::stream_id_prefix(["ES1"]);
        let s2 = FilterSpec::event_type_regex("^other");
        let combined = filter(&[s1.clone(), s2.clone()]);
        let only_s1 = filter(&[s1]);
        let only_s2 = filter(&[s2]);

        let records = [
            ("ES1", "event-type"),
            ("ES2", "other-event-type"),
            ("ES3", "event-type"),
            ("ES1", "other-event-type"),
        ];
        for (stream, event_type) in records {
            assert_eq!(
                combined.is_allowed(stream, event_type),
                only_s1.is_allowed(stream, event_type) || only_s2.is_allowed(stream, event_type),
                "{} / {}",
                stream,
                event_type
            );
        }
        assert!(!combined.is_allowed("ES3", "event-type"));
    }

    #[test]
    fn test_clause_order_does_not_change_result() {
        let a = FilterSpec::stream_id_prefix(["ES1"]);
        let b = FilterSpec::event_type_prefix(["other"]);
        let ab = filter(&[a.clone(), b.clone()]);
        let ba = filter(&[b, a]);
        for (stream, event_type) in [("ES1", "x"), ("ES9", "other"), ("ES9", "x")] {
            assert_eq!(
                ab.is_allowed(stream, event_type),
                ba.is_allowed(stream, event_type)
            );
        }
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let f = filter(&[FilterSpec::event_type_regex("^[^$]")]);
        let first: Vec<bool> = ["a", "$b", "c"]
            .iter()
            .map(|t| f.is_allowed("s", t))
            .collect();
        for _ in 0..3 {
            let again: Vec<bool> = ["a", "$b", "c"]
                .iter()
                .map(|t| f.is_allowed("s", t))
                .collect();
            assert_eq!(first, again);
        }
        assert_eq!(first, vec![true, false, true]);
    }

    #[test]
    fn test_empty_patterns_fail_construction() {
        let spec = FilterSpec::new(FilterContext::EventType, FilterKind::Prefix, vec![]);
        let err = EventFilter::new(&[spec]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please provide a comma delimited list of data with at least one item"
        );
    }

    #[test]
    fn test_bad_regex_fails_construction() {
        let err = EventFilter::new(&[FilterSpec::stream_id_regex("([")]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidRegex { ref pattern, .. } if pattern == "(["));
    }

    #[test]
    fn test_from_requests_rejects_unknown_context() {
        let err = EventFilter::from_requests(&[FilterRequest::new("foo", "prefix", "a")])
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidContext(_)));
    }

    #[test]
    fn test_filter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EventFilter>();
    }

    #[test]
    fn test_display_joins_clauses() {
        let f = filter(&[
            FilterSpec::stream_id_prefix(["ES1"]),
            FilterSpec::event_type_regex("^a"),
        ]);
        assert_eq!(f.to_string(), "StreamId Prefix [ES1] OR EventType Regex /^a/");
    }
}
