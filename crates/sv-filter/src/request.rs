//! # Wire Filter Requests
//!
//! A [`FilterRequest`] is a filter exactly as a client sent it: three loose
//! strings nobody has checked yet. [`FilterRequest::validate`] is the gate
//! between the network and [`EventFilter`] construction; it rejects a bad
//! request with a message that enumerates the accepted values.
//!
//! [`EventFilter`]: crate::EventFilter

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::model::{FilterContext, FilterKind, FilterSpec};

/// Pattern list as sent on the wire: a JSON list or a comma delimited string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterData {
    List(Vec<String>),
    Delimited(String),
}

impl FilterData {
    /// Trimmed, non-empty patterns in order.
    pub fn patterns(&self) -> Vec<String> {
        match self {
            FilterData::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            FilterData::Delimited(raw) => split_data(raw),
        }
    }
}

/// An unvalidated filter clause, as decoded from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub data: Option<FilterData>,
}

impl FilterRequest {
    pub fn new(context: impl Into<String>, kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            kind: Some(kind.into()),
            data: Some(FilterData::Delimited(data.into())),
        }
    }

    /// Check context, then type, then data, and build the clause.
    pub fn validate(&self) -> Result<FilterSpec, FilterError> {
        let context: FilterContext = self.context.as_deref().unwrap_or_default().parse()?;
        let kind: FilterKind = self.kind.as_deref().unwrap_or_default().parse()?;
        let patterns = self
            .data
            .as_ref()
            .map(FilterData::patterns)
            .unwrap_or_default();
        if patterns.is_empty() {
            return Err(FilterError::MissingData);
        }
        Ok(FilterSpec::new(context, kind, patterns))
    }
}

/// Parse the `context:type:data` shorthand, e.g. `eventtype:prefix:order-,invoice-`.
///
/// Only the first two colons separate fields, so a regex may contain more.
impl FromStr for FilterRequest {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let request = FilterRequest {
            context: parts.next().map(str::to_string),
            kind: parts.next().map(str::to_string),
            data: parts.next().map(|d| FilterData::Delimited(d.to_string())),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Split a comma delimited pattern list, dropping blank items.
pub fn split_data(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_builds_spec() {
        let spec = FilterRequest::new("eventtype", "prefix", "event-")
            .validate()
            .unwrap();
        assert_eq!(spec.context, FilterContext::EventType);
        assert_eq!(spec.kind, FilterKind::Prefix);
        assert_eq!(spec.patterns, vec!["event-"]);
    }

    #[test]
    fn test_invalid_context_message() {
        let err = FilterRequest::new("foo", "prefix", "a").validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid context please provide one of the following: StreamId, EventType"
        );
    }

    #[test]
    fn test_missing_context_is_invalid_context() {
        let request = FilterRequest::default();
        assert!(matches!(
            request.validate(),
            Err(FilterError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_invalid_type_message() {
        let err = FilterRequest::new("streamid", "foo", "a")
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type please provide one of the following: Regex, Prefix"
        );
    }

    #[test]
    fn test_missing_data_message() {
        let request = FilterRequest {
            context: Some("streamid".into()),
            kind: Some("prefix".into()),
            data: None,
        };
        assert_eq!(
            request.validate().unwrap_err().to_string(),
            "Please provide a comma delimited list of data with at least one item"
        );
    }

    #[test]
    fn test_blank_items_do_not_count_as_data() {
        let err = FilterRequest::new("streamid", "prefix", " , ,")
            .validate()
            .unwrap_err();
        assert!(matches!(err, FilterError::MissingData));
    }

    #[test]
    fn test_context_is_checked_before_type() {
        let err = FilterRequest::new("foo", "bar", "").validate().unwrap_err();
        assert!(matches!(err, FilterError::InvalidContext(_)));
    }

    #[test]
    fn test_split_data_trims_items() {
        assert_eq!(split_data("a, b ,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deserialize_list_form() {
        let request: FilterRequest = serde_json::from_str(
            r#"{"context":"StreamId","type":"Prefix","data":["ES1","ES2"]}"#,
        )
        .unwrap();
        let spec = request.validate().unwrap();
        assert_eq!(spec.patterns, vec!["ES1", "ES2"]);
    }

    #[test]
    fn test_deserialize_delimited_form() {
        let request: FilterRequest =
            serde_json::from_str(r#"{"context":"eventtype","type":"regex","data":"^a.*,ignored"}"#)
                .unwrap();
        let spec = request.validate().unwrap();
        assert_eq!(spec.kind, FilterKind::Regex);
        assert_eq!(spec.patterns, vec!["^a.*", "ignored"]);
    }

    #[test]
    fn test_parse_shorthand_keeps_colons_in_data() {
        let request: FilterRequest = "streamid:regex:^tenant:[0-9]+$".parse().unwrap();
        assert_eq!(
            request.data,
            Some(FilterData::Delimited("^tenant:[0-9]+$".into()))
        );
    }

    #[test]
    fn test_parse_shorthand_without_type() {
        let err = "eventtype".parse::<FilterRequest>().unwrap_err();
        assert!(matches!(err, FilterError::InvalidKind(_)));
    }
}
