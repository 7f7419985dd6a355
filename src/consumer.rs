// src/consumer.rs
//! Single reader of the event channel. Waits in short bounded slices so a
//! shutdown request is noticed within one `recv_timeout`.

use metrics::{counter, gauge};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::ingest::channel::{EventReceiver, Recv};
use crate::notify::Notifier;

pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsumerCfg {
    pub recv_timeout: Duration,
    /// Delay after each delivered event; throttles output only.
    pub pause: Duration,
}

impl Default for ConsumerCfg {
    fn default() -> Self {
        Self {
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            pause: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    ChannelClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerReport {
    pub delivered: u64,
    pub failed: u64,
    pub stopped_by: StopReason,
}

pub async fn run_consumer(
    rx: &mut EventReceiver,
    sink: &dyn Notifier,
    cfg: ConsumerCfg,
    shutdown: &CancellationToken,
) -> ConsumerReport {
    let mut delivered = 0u64;
    let mut failed = 0u64;

    let stopped_by = loop {
        if shutdown.is_cancelled() {
            break StopReason::Shutdown;
        }
        let ev = match rx.recv_timeout(cfg.recv_timeout).await {
            Recv::Received(ev) => ev,
            Recv::Timeout => continue,
            Recv::Closed => break StopReason::ChannelClosed,
        };
        gauge!("slurper_channel_depth").set(rx.len() as f64);

        // A sink stuck on a slow webhook must not hold up shutdown.
        let delivery = tokio::select! {
            _ = shutdown.cancelled() => break StopReason::Shutdown,
            res = sink.send(&ev) => res,
        };
        match delivery {
            Ok(()) => {
                delivered += 1;
                counter!("slurper_events_delivered_total").increment(1);
            }
            Err(e) => {
                failed += 1;
                counter!("slurper_delivery_failures_total").increment(1);
                let error = format!("{e:#}");
                tracing::error!(source = %ev.source, link = %ev.link, %error, "event delivery failed");
            }
        }

        if !cfg.pause.is_zero() {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(cfg.pause) => {}
            }
        }
    };

    tracing::info!(delivered, failed, reason = ?stopped_by, "consumer stopped");
    ConsumerReport {
        delivered,
        failed,
        stopped_by,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::channel::event_channel;
    use crate::ingest::types::{Event, EventKind};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn send(&self, _ev: &Event) -> Result<()> {
            anyhow::bail!("sink down")
        }
    }

    #[tokio::test]
    async fn sink_failures_are_counted_not_fatal() {
        let (tx, mut rx) = event_channel();
        for i in 0..3 {
            tx.send(Event {
                source: "S".into(),
                link: format!("l{i}"),
                occurred_at: Utc::now(),
                text: String::new(),
                author: None,
                title: None,
                kind: EventKind::Post,
            });
        }
        drop(tx);
        let cfg = ConsumerCfg {
            recv_timeout: Duration::from_millis(20),
            pause: Duration::ZERO,
        };
        let report = run_consumer(&mut rx, &Failing, cfg, &CancellationToken::new()).await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, 3);
        assert_eq!(report.stopped_by, StopReason::ChannelClosed);
    }
}
