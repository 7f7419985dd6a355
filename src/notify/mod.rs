// src/notify/mod.rs
//! Display sinks. The consumer hands every event to one `Notifier`; the
//! console sink is always on, webhook sinks are enabled by env vars.

pub mod discord;
pub mod format;
pub mod slack;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use tokio::io::AsyncWriteExt;

use crate::ingest::types::Event;

pub use format::format_event;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, ev: &Event) -> Result<()>;
}

/// Prints the human-readable block to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send(&self, ev: &Event) -> Result<()> {
        let mut out = tokio::io::stdout();
        let block = format!("{}\n", format_event(ev));
        out.write_all(block.as_bytes())
            .await
            .context("write to stdout")?;
        out.flush().await.context("flush stdout")?;
        Ok(())
    }
}

/// Delivers to every configured sink. A failing webhook is logged and
/// counted per sink; the event only counts as undelivered when no sink
/// accepted it.
pub struct NotifierMux {
    sinks: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(sinks: Vec<Box<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    /// Console plus Slack (`SLACK_WEBHOOK_URL`) and Discord
    /// (`DISCORD_WEBHOOK_URL`) when set.
    pub fn from_env() -> Self {
        let mut sinks: Vec<Box<dyn Notifier>> = vec![Box::new(ConsoleNotifier)];
        if let Some(slack) = slack::SlackNotifier::from_env() {
            sinks.push(Box::new(slack));
        }
        if let Some(discord) = discord::DiscordNotifier::from_env() {
            sinks.push(Box::new(discord));
        }
        tracing::info!(
            sinks = ?sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "display sinks configured"
        );
        Self { sinks }
    }
}

#[async_trait]
impl Notifier for NotifierMux {
    fn name(&self) -> &'static str {
        "mux"
    }

    async fn send(&self, ev: &Event) -> Result<()> {
        let mut failed = Vec::new();
        let mut accepted = 0usize;
        for sink in &self.sinks {
            match sink.send(ev).await {
                Ok(()) => accepted += 1,
                Err(e) => {
                    counter!("slurper_sink_errors_total", "sink" => sink.name()).increment(1);
                    let error = format!("{e:#}");
                    tracing::warn!(sink = sink.name(), %error, "sink delivery failed");
                    failed.push(sink.name());
                }
            }
        }
        if accepted == 0 && !failed.is_empty() {
            anyhow::bail!("delivery failed for sinks: {}", failed.join(", "))
        }
        Ok(())
    }
}
