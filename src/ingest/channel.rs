// src/ingest/channel.rs
//! Many-producer / single-consumer event queue with a bounded-wait read.
//!
//! Capacity is unbounded: pollers never block or fail on `send` while the
//! consumer is alive. Items keep per-producer arrival order; there is no
//! global ordering across producers.

use std::time::Duration;
use tokio::sync::mpsc;

use crate::ingest::types::Event;

/// Outcome of a bounded wait on the channel.
#[derive(Debug, PartialEq, Eq)]
pub enum Recv {
    Received(Event),
    /// Nothing arrived within the wait. Not an error.
    Timeout,
    /// Every sender is gone and the queue is drained.
    Closed,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
}

pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Non-blocking. Returns `false` only when the consumer is gone.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl EventReceiver {
    /// Next event, waiting at most `wait`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Recv {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(ev)) => Recv::Received(ev),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Timeout,
        }
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::EventKind;
    use chrono::Utc;

    fn ev(source: &str, text: &str) -> Event {
        Event {
            source: source.into(),
            link: format!("https://example.test/{text}"),
            occurred_at: Utc::now(),
            text: text.into(),
            author: None,
            title: None,
            kind: EventKind::Post,
        }
    }

    #[tokio::test]
    async fn keeps_arrival_order_per_producer() {
        let (tx, mut rx) = event_channel();
        assert!(tx.send(ev("A", "1")));
        assert!(tx.send(ev("A", "2")));
        assert_eq!(rx.len(), 2);

        let wait = Duration::from_millis(50);
        match rx.recv_timeout(wait).await {
            Recv::Received(e) => assert_eq!(e.text, "1"),
            other => panic!("unexpected {other:?}"),
        }
        match rx.recv_timeout(wait).await {
            Recv::Received(e) => assert_eq!(e.text, "2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_after_all_senders_dropped() {
        let (tx, mut rx) = event_channel();
        tx.send(ev("A", "last"));
        drop(tx);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)).await,
            Recv::Received(_)
        ));
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)).await, Recv::Closed);
    }

    #[tokio::test]
    async fn send_reports_missing_consumer() {
        let (tx, rx) = event_channel();
        drop(rx);
        assert!(!tx.send(ev("A", "lost")));
    }
}
