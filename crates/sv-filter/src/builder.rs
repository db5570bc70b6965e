use crate::error::FilterError;
use crate::filter::EventFilter;
use crate::model::FilterSpec;

/// Regex over event types that rejects anything starting with the system
/// marker `$`.
pub const EXCLUDE_SYSTEM_EVENTS: &str = r"^[^\$].*";

/// Accumulates clauses for an [`EventFilter`].
///
/// Every clause added is OR-ed with the others: two event type prefixes
/// admit an event matching either one.
#[derive(Debug, Clone, Default)]
pub struct EventFilterBuilder {
    specs: Vec<FilterSpec>,
}

impl EventFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.specs.push(FilterSpec::event_type_prefix([prefix]));
        self
    }

    pub fn with_event_type_regex(mut self, pattern: impl Into<String>) -> Self {
        self.specs.push(FilterSpec::event_type_regex(pattern));
        self
    }

    pub fn with_stream_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.specs.push(FilterSpec::stream_id_prefix([prefix]));
        self
    }

    pub fn with_stream_id_regex(mut self, pattern: impl Into<String>) -> Self {
        self.specs.push(FilterSpec::stream_id_regex(pattern));
        self
    }

    pub fn with_spec(mut self, spec: FilterSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Drop system events (event types starting with `$`).
    pub fn exclude_system_events(self) -> Self {
        self.with_event_type_regex(EXCLUDE_SYSTEM_EVENTS)
    }

    pub fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }

    pub fn build(&self) -> Result<EventFilter, FilterError> {
        EventFilter::new(&self.specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_allows_all() {
        let filter = EventFilterBuilder::new().build().unwrap();
        assert!(filter.is_allow_all());
    }

    #[test]
    fn test_exclude_system_events() {
        let filter = EventFilterBuilder::new()
            .exclude_system_events()
            .build()
            .unwrap();
        assert!(filter.is_allowed("orders", "OrderPlaced"));
        assert!(!filter.is_allowed("$stats", "$statsCollected"));
        assert!(filter.is_allowed("$stats", "user-type"));
    }

    #[test]
    fn test_clauses_are_or_ed() {
        let filter = EventFilterBuilder::new()
            .with_event_type_prefix("order")
            .with_stream_id_prefix("invoice-")
            .build()
            .unwrap();
        assert!(filter.is_allowed("x", "orderPlaced"));
        assert!(filter.is_allowed("invoice-1", "paid"));
        assert!(!filter.is_allowed("x", "paid"));
        assert_eq!(
            EventFilterBuilder::new()
                .with_event_type_prefix("order")
                .with_stream_id_prefix("invoice-")
                .specs()
                .len(),
            2
        );
    }

    #[test]
    fn test_bad_regex_surfaces_on_build() {
        let result = EventFilterBuilder::new().with_stream_id_regex("(").build();
        assert!(matches!(result, Err(FilterError::InvalidRegex { .. })));
    }
}
