use thiserror::Error;

/// Errors raised while turning a filter description into an [`EventFilter`].
///
/// The messages for unrecognized context, type and missing data are part of
/// the client contract: callers show them verbatim so a user can correct the
/// request without consulting documentation.
///
/// [`EventFilter`]: crate::EventFilter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid context please provide one of the following: StreamId, EventType")]
    InvalidContext(String),

    #[error("Invalid type please provide one of the following: Regex, Prefix")]
    InvalidKind(String),

    #[error("Please provide a comma delimited list of data with at least one item")]
    MissingData,

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
