// src/ingest/poller.rs
//! One poller per source: fetch, filter against the watermark, normalize,
//! enqueue, sleep, forever.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::ingest::channel::EventSender;
use crate::ingest::error::FetchError;
use crate::ingest::types::{FetchAdapter, SourceDescriptor};
use crate::ingest::watermark::Watermark;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// What one successful cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    /// Items newer than the watermark (relevant or not).
    pub fresh: usize,
    pub emitted: usize,
    /// Set when the consumer side of the channel is gone.
    pub channel_closed: bool,
}

/// State owned by a single poller task. Nothing here is shared.
pub struct Poller<A: FetchAdapter> {
    source: SourceDescriptor,
    adapter: Arc<A>,
    tx: EventSender,
    interval: Duration,
    watermark: Watermark<A::Key>,
}

impl<A: FetchAdapter> Poller<A> {
    pub fn new(
        source: SourceDescriptor,
        adapter: Arc<A>,
        tx: EventSender,
        interval: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        let watermark = Watermark::new(adapter.initial_watermark(started_at));
        Self {
            source,
            adapter,
            tx,
            interval,
            watermark,
        }
    }

    pub fn watermark(&self) -> A::Key {
        self.watermark.get()
    }

    /// Run a single fetch/filter/emit cycle. On error the watermark is left
    /// untouched and nothing is emitted.
    pub async fn poll_once(&mut self) -> Result<CycleReport, FetchError> {
        counter!("slurper_fetch_total", "kind" => self.adapter.kind()).increment(1);
        let mut items = self
            .adapter
            .fetch(&self.source, self.watermark.get())
            .await?;

        // Oldest first, whatever order the source used.
        items.sort_by_key(|it| it.key);

        let mut report = CycleReport {
            fetched: items.len(),
            ..CycleReport::default()
        };
        for item in items {
            if self.watermark.has_seen(item.key) {
                continue;
            }
            self.watermark.advance(item.key);
            report.fresh += 1;

            if !self.adapter.is_relevant(&item) {
                tracing::trace!(source = %self.source.name, key = ?item.key, "item filtered");
                continue;
            }
            let event = self.adapter.to_event(&self.source, item);
            if !self.tx.send(event) {
                report.channel_closed = true;
                break;
            }
            report.emitted += 1;
        }

        if report.emitted > 0 {
            counter!("slurper_events_emitted_total", "source" => self.source.name.clone())
                .increment(report.emitted as u64);
        }
        Ok(report)
    }
}

/// Task body of a poller. Fetch errors are logged and retried one interval
/// later, indefinitely. Returns only once the consumer has gone away.
pub async fn run_poller<A: FetchAdapter>(mut poller: Poller<A>) {
    tracing::info!(
        source = %poller.source.name,
        kind = poller.adapter.kind(),
        interval_secs = poller.interval.as_secs(),
        "poller started"
    );
    loop {
        match poller.poll_once().await {
            Ok(report) => {
                if report.channel_closed {
                    tracing::info!(source = %poller.source.name, "event channel closed, poller exiting");
                    return;
                }
                tracing::debug!(
                    source = %poller.source.name,
                    fetched = report.fetched,
                    fresh = report.fresh,
                    emitted = report.emitted,
                    watermark = ?poller.watermark(),
                    "poll cycle done"
                );
            }
            Err(e) => {
                counter!("slurper_fetch_errors_total", "source" => poller.source.name.clone())
                    .increment(1);
                tracing::warn!(
                    source = %poller.source.name,
                    kind = e.kind_str(),
                    error = %e,
                    "fetch failed, skipping cycle"
                );
            }
        }
        tokio::time::sleep(poller.interval).await;
    }
}

/// Detach a poller onto the runtime. The handle is not meant to be joined.
pub fn spawn_poller<A: FetchAdapter + 'static>(poller: Poller<A>) -> JoinHandle<()> {
    tokio::spawn(run_poller(poller))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::channel::{event_channel, Recv};
    use crate::ingest::types::{Event, EventKind, RawItem};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed batch every time and ignores `since`.
    struct SameBatch {
        batch: Vec<RawItem<u64>>,
        since_seen: Mutex<Vec<u64>>,
    }

    fn raw(id: u64, text: &str) -> RawItem<u64> {
        RawItem {
            key: id,
            author: None,
            title: None,
            text: text.into(),
            link: format!("https://example.test/{id}"),
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl FetchAdapter for SameBatch {
        type Key = u64;
        fn kind(&self) -> &'static str {
            "test"
        }
        fn initial_watermark(&self, _started_at: DateTime<Utc>) -> u64 {
            1
        }
        async fn fetch(
            &self,
            _source: &SourceDescriptor,
            since: u64,
        ) -> Result<Vec<RawItem<u64>>, FetchError> {
            self.since_seen.lock().unwrap().push(since);
            Ok(self.batch.clone())
        }
        fn is_relevant(&self, item: &RawItem<u64>) -> bool {
            !item.text.starts_with("skip")
        }
        fn to_event(&self, source: &SourceDescriptor, item: RawItem<u64>) -> Event {
            Event {
                source: source.name.clone(),
                link: item.link,
                occurred_at: item.created_at,
                text: item.text,
                author: None,
                title: None,
                kind: EventKind::Post,
            }
        }
    }

    #[tokio::test]
    async fn repeated_batches_are_not_reemitted() {
        let adapter = Arc::new(SameBatch {
            batch: vec![raw(4, "b"), raw(2, "a")],
            since_seen: Mutex::new(vec![]),
        });
        let (tx, mut rx) = event_channel();
        let mut p = Poller::new(
            SourceDescriptor::new("S", "s"),
            adapter.clone(),
            tx,
            DEFAULT_POLL_INTERVAL,
            Utc::now(),
        );

        let first = p.poll_once().await.unwrap();
        assert_eq!(first.emitted, 2);
        let second = p.poll_once().await.unwrap();
        assert_eq!(second.fetched, 2);
        assert_eq!(second.emitted, 0);
        assert_eq!(*adapter.since_seen.lock().unwrap(), vec![1, 4]);

        let wait = Duration::from_millis(10);
        assert!(matches!(rx.recv_timeout(wait).await, Recv::Received(e) if e.text == "a"));
        assert!(matches!(rx.recv_timeout(wait).await, Recv::Received(e) if e.text == "b"));
        assert_eq!(rx.recv_timeout(wait).await, Recv::Timeout);
    }

    #[tokio::test]
    async fn filtered_items_still_advance_watermark() {
        let adapter = Arc::new(SameBatch {
            batch: vec![raw(3, "keep"), raw(8, "skip me")],
            since_seen: Mutex::new(vec![]),
        });
        let (tx, _rx) = event_channel();
        let mut p = Poller::new(
            SourceDescriptor::new("S", "s"),
            adapter,
            tx,
            DEFAULT_POLL_INTERVAL,
            Utc::now(),
        );
        let report = p.poll_once().await.unwrap();
        assert_eq!(report.fresh, 2);
        assert_eq!(report.emitted, 1);
        assert_eq!(p.watermark(), 8);
    }

    #[tokio::test]
    async fn closed_channel_is_reported() {
        let adapter = Arc::new(SameBatch {
            batch: vec![raw(3, "x")],
            since_seen: Mutex::new(vec![]),
        });
        let (tx, rx) = event_channel();
        drop(rx);
        let mut p = Poller::new(
            SourceDescriptor::new("S", "s"),
            adapter,
            tx,
            DEFAULT_POLL_INTERVAL,
            Utc::now(),
        );
        let report = p.poll_once().await.unwrap();
        assert!(report.channel_closed);
        assert_eq!(report.emitted, 0);
    }
}
