// src/ingest/mod.rs
pub mod auth;
pub mod channel;
pub mod directory;
pub mod error;
pub mod poller;
pub mod providers;
pub mod types;
pub mod watermark;

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

pub use channel::{event_channel, EventReceiver, EventSender, Recv};
pub use error::{FetchError, FetchErrorKind};
pub use poller::{run_poller, spawn_poller, CycleReport, Poller};
pub use types::{Credential, Event, EventKind, FetchAdapter, RawItem, SourceDescriptor};

const MAX_TEXT_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("slurper_fetch_total", "Fetch attempts by source kind.");
        describe_counter!(
            "slurper_fetch_errors_total",
            "Fetch cycles skipped because of an adapter error."
        );
        describe_counter!(
            "slurper_events_emitted_total",
            "Events placed on the channel by pollers."
        );
        describe_counter!(
            "slurper_events_delivered_total",
            "Events delivered to the display sink."
        );
        describe_counter!(
            "slurper_sink_errors_total",
            "Per-sink delivery failures, labelled by sink."
        );
        describe_counter!(
            "slurper_delivery_failures_total",
            "Events that no display sink accepted."
        );
        describe_gauge!("slurper_channel_depth", "Events waiting in the channel.");
    });
}

/// Normalize display text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}
