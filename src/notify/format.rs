// src/notify/format.rs
use crate::ingest::types::{Event, EventKind};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Headline used by the webhook sinks.
pub fn headline(ev: &Event) -> String {
    match ev.kind {
        EventKind::Post => format!("A new tweet by {}!", ev.source),
        EventKind::Edit { .. } => format!("A new wiki update at {}!", ev.source),
    }
}

/// Human-readable notification block (without trailing newline).
pub fn format_event(ev: &Event) -> String {
    let at = ev.occurred_at.format(TIME_FORMAT);
    match &ev.kind {
        EventKind::Post => format!(
            "{}\n    At {} - {}\n    Tweet: {}\n",
            headline(ev),
            at,
            ev.link,
            ev.text
        ),
        EventKind::Edit { article } => {
            let mut out = format!(
                "{}\n    {} made a change to the article {}\n    Link: {}\n    Diff: {}\n",
                headline(ev),
                ev.author.as_deref().unwrap_or("Someone"),
                ev.title.as_deref().unwrap_or("(untitled)"),
                article,
                ev.link
            );
            if !ev.text.is_empty() {
                out.push_str(&format!("    Summary: {}\n", ev.text));
            }
            out
        }
    }
}
