//! # Filtered Subscription
//!
//! A live, forward-only read of the all-stream through a filter. Each call to
//! [`FilteredSubscription::next`] runs window-bounded scans until it has
//! something to hand back:
//!
//! - a batch of matching records, or
//! - a checkpoint after `checkpoint_interval` windows in a row matched
//!   nothing, so a caller can persist progress through long stretches of
//!   irrelevant records.
//!
//! At the end of the log the subscription parks on the source's head watch
//! until a record is appended. Both the scan and the park observe the
//! cancellation token.

use std::sync::Arc;

use serde::Deserialize;
use sv_core::TFPos;
use sv_filter::EventFilter;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::record::LogRecord;
use crate::scan::{scan_window, ScanRequest};
use crate::source::RecordSource;

/// What a subscription does when a record fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Report the error and close the subscription.
    #[default]
    TerminateSubscription,
    /// Report the error and stay at the same position. The next call retries
    /// the same window.
    FailPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub max_records: usize,
    pub max_search_window: usize,
    /// Empty windows in a row before a checkpoint. Zero disables checkpoints.
    pub checkpoint_interval: u32,
    pub decode_policy: DecodePolicy,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            max_records: 20,
            max_search_window: 100,
            checkpoint_interval: 10,
            decode_policy: DecodePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionItem {
    /// Matches in ascending position order.
    Records(Vec<LogRecord>),
    /// Every record before this position has been examined.
    Checkpoint(TFPos),
}

pub struct FilteredSubscription {
    source: Arc<dyn RecordSource>,
    filter: Arc<EventFilter>,
    options: SubscriptionOptions,
    cancel: CancellationToken,
    head_rx: watch::Receiver<TFPos>,
    position: TFPos,
    empty_windows: u32,
    closed: bool,
}

impl FilteredSubscription {
    /// Subscribe from `from`. [`TFPos::HEAD`] subscribes to records appended
    /// from now on.
    pub fn new(
        source: Arc<dyn RecordSource>,
        filter: Arc<EventFilter>,
        from: TFPos,
        options: SubscriptionOptions,
        cancel: CancellationToken,
    ) -> Result<Self> {
        ScanRequest::forward(from, options.max_records, options.max_search_window).validate()?;

        let head_rx = source.watch_head();
        let position = if from.is_head() { source.head() } else { from };
        tracing::debug!(from = %position, filter = %filter, "subscription started");

        Ok(Self {
            source,
            filter,
            options,
            cancel,
            head_rx,
            position,
            empty_windows: 0,
            closed: false,
        })
    }

    /// Where the next window starts.
    pub fn position(&self) -> TFPos {
        self.position
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub async fn next(&mut self) -> Result<SubscriptionItem> {
        if self.closed {
            return Err(Error::SubscriptionClosed);
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let request = ScanRequest::forward(
                self.position,
                self.options.max_records,
                self.options.max_search_window,
            );
            let (page, failure) =
                scan_window(self.source.as_ref(), &request, &self.filter, &self.cancel)?;
            self.position = page.next_position;

            // Matches ahead of a bad record go out first; the next call
            // starts at the bad record and reports it.
            if !page.records.is_empty() {
                self.empty_windows = 0;
                return Ok(SubscriptionItem::Records(page.records));
            }

            if let Some(e) = failure {
                if self.options.decode_policy == DecodePolicy::TerminateSubscription {
                    tracing::warn!(at = %self.position, error = %e, "closing subscription");
                    self.closed = true;
                }
                return Err(e);
            }

            self.empty_windows += 1;
            let interval = self.options.checkpoint_interval;
            if interval > 0 && self.empty_windows >= interval {
                self.empty_windows = 0;
                tracing::trace!(at = %self.position, "subscription checkpoint");
                return Ok(SubscriptionItem::Checkpoint(self.position));
            }

            if page.is_end_of_stream {
                self.wait_for_append().await?;
            } else {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Park until the head moves past the current position.
    async fn wait_for_append(&mut self) -> Result<()> {
        let position = self.position;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            changed = self.head_rx.wait_for(|head| *head > position) => {
                changed.map(|_| ()).map_err(|_| Error::SubscriptionClosed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLog;
    use crate::record::EventData;
    use sv_filter::FilterSpec;

    fn subscribe(
        log: &Arc<MemoryLog>,
        filter: EventFilter,
        from: TFPos,
        options: SubscriptionOptions,
    ) -> (FilteredSubscription, CancellationToken) {
        let cancel = CancellationToken::new();
        let source: Arc<dyn RecordSource> = log.clone();
        let sub = FilteredSubscription::new(source, Arc::new(filter), from, options, cancel.clone())
            .unwrap();
        (sub, cancel)
    }

    fn records(item: SubscriptionItem) -> Vec<String> {
        match item {
            SubscriptionItem::Records(records) => {
                records.into_iter().map(|r| r.stream_id).collect()
            }
            other => panic!("expected records, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delivers_existing_then_live_records() {
        let log = Arc::new(
            MemoryLog::with_events(&[
                EventData::new("orders-1", "OrderPlaced", Vec::<u8>::new()),
                EventData::new("users-1", "UserCreated", Vec::<u8>::new()),
            ])
            .unwrap(),
        );
        let filter = EventFilter::new(&[FilterSpec::stream_id_prefix(["orders"])]).unwrap();
        let (mut sub, _cancel) = subscribe(&log, filter, TFPos::ZERO, SubscriptionOptions::default());

        assert_eq!(records(sub.next().await.unwrap()), vec!["orders-1"]);

        let writer = log.clone();
        tokio::spawn(async move {
            writer.append(&EventData::new("users-2", "UserCreated", Vec::<u8>::new())).unwrap();
            writer.append(&EventData::new("orders-2", "OrderPlaced", Vec::<u8>::new())).unwrap();
        });

        assert_eq!(records(sub.next().await.unwrap()), vec!["orders-2"]);
        assert_eq!(sub.position(), log.head());
    }

    #[tokio::test]
    async fn test_checkpoint_after_empty_windows() {
        let log = Arc::new(MemoryLog::new());
        let mut positions = Vec::new();
        for i in 0..30 {
            positions.push(log.append(&EventData::new(format!("noise-{}", i), "t", Vec::<u8>::new())).unwrap());
        }
        let filter = EventFilter::new(&[FilterSpec::stream_id_prefix(["wanted"])]).unwrap();
        let options = SubscriptionOptions {
            max_records: 10,
            max_search_window: 5,
            checkpoint_interval: 2,
            ..SubscriptionOptions::default()
        };
        let (mut sub, _cancel) = subscribe(&log, filter, TFPos::ZERO, options);

        assert_eq!(
            sub.next().await.unwrap(),
            SubscriptionItem::Checkpoint(positions[10])
        );
        assert_eq!(
            sub.next().await.unwrap(),
            SubscriptionItem::Checkpoint(positions[20])
        );
    }

    #[tokio::test]
    async fn test_from_head_skips_existing_records() {
        let log = Arc::new(
            MemoryLog::with_events(&[EventData::new("old", "t", Vec::<u8>::new())]).unwrap(),
        );
        let (mut sub, _cancel) = subscribe(
            &log,
            EventFilter::allow_all(),
            TFPos::HEAD,
            SubscriptionOptions::default(),
        );
        assert_eq!(sub.position(), log.head());

        let writer = log.clone();
        tokio::spawn(async move {
            writer.append(&EventData::new("new", "t", Vec::<u8>::new())).unwrap();
        });
        assert_eq!(records(sub.next().await.unwrap()), vec!["new"]);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let log = Arc::new(MemoryLog::new());
        let (mut sub, cancel) = subscribe(
            &log,
            EventFilter::allow_all(),
            TFPos::ZERO,
            SubscriptionOptions::default(),
        );

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            cancel.cancel();
        });
        assert!(matches!(sub.next().await, Err(Error::Cancelled)));
        assert!(!sub.is_closed());
    }

    #[tokio::test]
    async fn test_decode_error_closes_subscription_by_default() {
        let log = Arc::new(
            MemoryLog::with_events(&[EventData::new("a", "t", b"payload".to_vec())]).unwrap(),
        );
        log.corrupt_byte(log.head().commit_position - 5);
        let (mut sub, _cancel) = subscribe(
            &log,
            EventFilter::allow_all(),
            TFPos::ZERO,
            SubscriptionOptions::default(),
        );

        assert!(matches!(sub.next().await, Err(Error::Decode { .. })));
        assert!(sub.is_closed());
        assert!(matches!(sub.next().await, Err(Error::SubscriptionClosed)));
    }

    #[tokio::test]
    async fn test_fail_page_policy_keeps_subscription_open() {
        let log = Arc::new(
            MemoryLog::with_events(&[EventData::new("a", "t", b"payload".to_vec())]).unwrap(),
        );
        log.corrupt_byte(log.head().commit_position - 5);
        let options = SubscriptionOptions {
            decode_policy: DecodePolicy::FailPage,
            ..SubscriptionOptions::default()
        };
        let (mut sub, _cancel) = subscribe(&log, EventFilter::allow_all(), TFPos::ZERO, options);

        assert!(matches!(sub.next().await, Err(Error::Decode { .. })));
        assert!(!sub.is_closed());
        assert_eq!(sub.position(), TFPos::ZERO);
        assert!(matches!(sub.next().await, Err(Error::Decode { .. })));
    }

    fn good_then_bad() -> (Arc<MemoryLog>, TFPos) {
        let log = Arc::new(MemoryLog::new());
        log.append(&EventData::new("good", "t", b"fine".to_vec())).unwrap();
        let bad = log.append(&EventData::new("bad", "t", b"payload".to_vec())).unwrap();
        log.corrupt_byte(log.head().commit_position - 5);
        (log, bad)
    }

    #[tokio::test]
    async fn test_fail_page_delivers_records_before_bad_record() {
        let (log, bad) = good_then_bad();
        let options = SubscriptionOptions {
            decode_policy: DecodePolicy::FailPage,
            ..SubscriptionOptions::default()
        };
        let (mut sub, _cancel) = subscribe(&log, EventFilter::allow_all(), TFPos::ZERO, options);

        assert_eq!(records(sub.next().await.unwrap()), vec!["good"]);
        assert_eq!(sub.position(), bad);

        for _ in 0..2 {
            match sub.next().await {
                Err(Error::Decode { position, .. }) => assert_eq!(position, bad),
                other => panic!("expected decode error, got {:?}", other),
            }
            assert!(!sub.is_closed());
            assert_eq!(sub.position(), bad);
        }
    }

    #[tokio::test]
    async fn test_terminate_delivers_records_before_closing() {
        let (log, bad) = good_then_bad();
        let (mut sub, _cancel) = subscribe(
            &log,
            EventFilter::allow_all(),
            TFPos::ZERO,
            SubscriptionOptions::default(),
        );

        assert_eq!(records(sub.next().await.unwrap()), vec!["good"]);
        assert!(matches!(sub.next().await, Err(Error::Decode { position, .. }) if position == bad));
        assert!(sub.is_closed());
        assert!(matches!(sub.next().await, Err(Error::SubscriptionClosed)));
    }

    #[tokio::test]
    async fn test_unmatched_records_before_bad_record_are_skipped() {
        let (log, bad) = good_then_bad();
        let filter = EventFilter::new(&[FilterSpec::stream_id_prefix(["nothing"])]).unwrap();
        let options = SubscriptionOptions {
            decode_policy: DecodePolicy::FailPage,
            ..SubscriptionOptions::default()
        };
        let (mut sub, _cancel) = subscribe(&log, filter, TFPos::ZERO, options);

        assert!(matches!(sub.next().await, Err(Error::Decode { .. })));
        assert_eq!(sub.position(), bad);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let log: Arc<dyn RecordSource> = Arc::new(MemoryLog::new());
        let options = SubscriptionOptions {
            max_records: 0,
            ..SubscriptionOptions::default()
        };
        let result = FilteredSubscription::new(
            log,
            Arc::new(EventFilter::allow_all()),
            TFPos::ZERO,
            options,
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_decode_policy_from_config_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: DecodePolicy,
        }
        let w: Wrapper = serde_json::from_str(r#"{"policy":"fail_page"}"#).unwrap();
        assert_eq!(w.policy, DecodePolicy::FailPage);
    }
}
