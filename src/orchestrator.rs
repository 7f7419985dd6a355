// src/orchestrator.rs
//! Startup wiring: resolve sources, start one poller per source on a shared
//! channel, then drain the channel on the calling task until shutdown.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::slurper::{sanitize_pause, SlurperConfig, TwitterCredentials, WikiCfg};
use crate::consumer::{run_consumer, ConsumerCfg, ConsumerReport, StopReason};
use crate::ingest::auth::fetch_bearer_token;
use crate::ingest::channel::{event_channel, EventSender};
use crate::ingest::directory::{all_space_info, twitter_sources};
use crate::ingest::poller::{spawn_poller, Poller};
use crate::ingest::providers::http_client;
use crate::ingest::providers::mediawiki::WikiFeedAdapter;
use crate::ingest::providers::twitter::TwitterTimelineAdapter;
use crate::ingest::types::{FetchAdapter, SourceDescriptor};
use crate::notify::{Notifier, NotifierMux};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Twitter,
    Wiki,
}

/// Effective cadence for one run, after CLI overrides.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunOptions {
    pub interval: Duration,
    pub consumer: ConsumerCfg,
}

impl RunOptions {
    pub fn resolve(
        mode: Mode,
        cfg: &SlurperConfig,
        interval_secs: Option<u64>,
        pause_secs: Option<f64>,
    ) -> Self {
        let (default_interval, default_pause) = match mode {
            Mode::Twitter => (cfg.twitter.interval_secs, cfg.twitter.pause_secs),
            Mode::Wiki => (cfg.wiki.interval_secs, cfg.wiki.pause_secs),
        };
        let interval = interval_secs.filter(|s| *s > 0).unwrap_or(default_interval);
        let pause = sanitize_pause(pause_secs.unwrap_or(default_pause));
        Self {
            interval: Duration::from_secs(interval),
            consumer: ConsumerCfg {
                recv_timeout: cfg.recv_timeout(),
                pause: Duration::try_from_secs_f64(pause).unwrap_or(Duration::ZERO),
            },
        }
    }
}

/// One descriptor per configured wiki, ordered by name.
pub fn wiki_sources(cfg: &WikiCfg) -> Vec<SourceDescriptor> {
    let mut out: Vec<SourceDescriptor> = cfg
        .sources
        .iter()
        .map(|w| SourceDescriptor::new(w.name.clone(), w.url.clone()))
        .collect();
    out.sort_by_key(|d| d.name.to_lowercase());
    out
}

/// Start one detached poller per source, all writing to `tx`.
pub fn spawn_pollers<A: FetchAdapter + 'static>(
    adapter: Arc<A>,
    sources: Vec<SourceDescriptor>,
    tx: &EventSender,
    interval: Duration,
    started_at: DateTime<Utc>,
) -> Vec<JoinHandle<()>> {
    sources
        .into_iter()
        .map(|source| {
            spawn_poller(Poller::new(
                source,
                adapter.clone(),
                tx.clone(),
                interval,
                started_at,
            ))
        })
        .collect()
}

/// Token, directory, then one timeline poller per space with a Twitter contact.
pub async fn start_twitter(
    cfg: &SlurperConfig,
    credentials: &TwitterCredentials,
    interval: Duration,
    tx: &EventSender,
    started_at: DateTime<Utc>,
) -> Result<Vec<JoinHandle<()>>> {
    let client = http_client(cfg.http_timeout())?;
    let token = fetch_bearer_token(
        &client,
        &cfg.twitter.token_url,
        &credentials.consumer_key,
        &credentials.consumer_secret,
    )
    .await
    .context("acquiring Twitter bearer token")?;

    let spaces = all_space_info(
        &client,
        &cfg.twitter.directory_url,
        Duration::from_millis(cfg.twitter.space_timeout_ms),
    )
    .await?;

    let sources: Vec<SourceDescriptor> = twitter_sources(&spaces)
        .into_iter()
        .map(|d| d.with_credential(token.clone()))
        .collect();
    for s in &sources {
        tracing::info!("[{}] is on Twitter: {}", s.name, s.endpoint);
    }

    let adapter = Arc::new(TwitterTimelineAdapter::new(
        client,
        cfg.twitter.api_base.clone(),
        started_at,
        cfg.startup_grace(),
    ));
    Ok(spawn_pollers(adapter, sources, tx, interval, started_at))
}

pub fn start_wiki(
    cfg: &SlurperConfig,
    interval: Duration,
    tx: &EventSender,
    started_at: DateTime<Utc>,
) -> Result<Vec<JoinHandle<()>>> {
    let client = http_client(cfg.http_timeout())?;
    let adapter = Arc::new(WikiFeedAdapter::new(
        client,
        cfg.startup_grace(),
        &cfg.wiki.diff_marker,
    ));
    let sources = wiki_sources(&cfg.wiki);
    for s in &sources {
        tracing::info!(wiki = %s.name, url = %s.endpoint, "watching recent changes");
    }
    Ok(spawn_pollers(adapter, sources, tx, interval, started_at))
}

async fn start_pollers(
    mode: Mode,
    cfg: &SlurperConfig,
    interval: Duration,
    tx: &EventSender,
    started_at: DateTime<Utc>,
) -> Result<Vec<JoinHandle<()>>> {
    match mode {
        Mode::Twitter => {
            let credentials = TwitterCredentials::from_env()?;
            start_twitter(cfg, &credentials, interval, tx, started_at).await
        }
        Mode::Wiki => start_wiki(cfg, interval, tx, started_at),
    }
}

/// Run until shutdown with the env-configured display sinks.
pub async fn run(
    mode: Mode,
    cfg: &SlurperConfig,
    opts: RunOptions,
    shutdown: CancellationToken,
) -> Result<ConsumerReport> {
    let sink = NotifierMux::from_env();
    run_with_sink(mode, cfg, opts, &sink, shutdown).await
}

pub async fn run_with_sink(
    mode: Mode,
    cfg: &SlurperConfig,
    opts: RunOptions,
    sink: &dyn Notifier,
    shutdown: CancellationToken,
) -> Result<ConsumerReport> {
    crate::ingest::ensure_metrics_described();
    let started_at = Utc::now();
    let (tx, mut rx) = event_channel();

    let pollers = tokio::select! {
        res = start_pollers(mode, cfg, opts.interval, &tx, started_at) => res?,
        _ = shutdown.cancelled() => {
            return Ok(ConsumerReport {
                delivered: 0,
                failed: 0,
                stopped_by: StopReason::Shutdown,
            });
        }
    };
    // Pollers hold their own senders; the channel closes when they all stop.
    drop(tx);

    if pollers.is_empty() {
        tracing::warn!(?mode, "no sources to poll");
    } else {
        tracing::info!(
            ?mode,
            pollers = pollers.len(),
            interval_secs = opts.interval.as_secs(),
            "pollers started"
        );
    }

    Ok(run_consumer(&mut rx, sink, opts.consumer, &shutdown).await)
}
