// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

use feed_slurper::ingest::types::RawItem;
use feed_slurper::notify::Notifier;
use feed_slurper::{Event, EventKind, FetchAdapter, FetchError, SourceDescriptor};

/// One scripted fetch result: item keys, or a transport failure.
pub enum Step {
    Items(Vec<u64>),
    Fail,
}

/// Replays a per-source script, then returns empty batches forever.
/// Records every call as (source, since, when).
#[derive(Default)]
pub struct ScriptedAdapter {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    pub calls: Mutex<Vec<(String, u64, Instant)>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, source: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .insert(source.to_string(), steps.into_iter().collect());
        self
    }

    pub fn calls_for(&self, source: &str) -> Vec<(u64, Instant)> {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _, _)| s == source)
            .map(|(_, since, at)| (*since, *at))
            .collect()
    }
}

#[async_trait]
impl FetchAdapter for ScriptedAdapter {
    type Key = u64;

    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn initial_watermark(&self, _started_at: DateTime<Utc>) -> u64 {
        1
    }

    async fn fetch(
        &self,
        source: &SourceDescriptor,
        since: u64,
    ) -> Result<Vec<RawItem<u64>>, FetchError> {
        self.calls
            .lock()
            .push((source.name.clone(), since, Instant::now()));
        let step = self
            .scripts
            .lock()
            .get_mut(&source.name)
            .and_then(|q| q.pop_front());
        match step {
            Some(Step::Items(keys)) => Ok(keys.into_iter().map(|k| raw(&source.name, k)).collect()),
            Some(Step::Fail) => Err(FetchError::Transport("connection reset".into())),
            None => Ok(Vec::new()),
        }
    }

    fn is_relevant(&self, _item: &RawItem<u64>) -> bool {
        true
    }

    fn to_event(&self, source: &SourceDescriptor, item: RawItem<u64>) -> Event {
        Event {
            source: source.name.clone(),
            link: item.link,
            occurred_at: item.created_at,
            text: item.text,
            author: item.author,
            title: None,
            kind: EventKind::Post,
        }
    }
}

pub fn raw(source: &str, key: u64) -> RawItem<u64> {
    RawItem {
        key,
        author: Some(source.to_string()),
        title: None,
        text: key.to_string(),
        link: format!("https://example.test/{source}/{key}"),
        created_at: Utc::now(),
    }
}

/// Sink that keeps everything it is handed.
#[derive(Default)]
pub struct Collecting {
    pub seen: Mutex<Vec<Event>>,
}

#[async_trait]
impl Notifier for Collecting {
    fn name(&self) -> &'static str {
        "collecting"
    }

    async fn send(&self, ev: &Event) -> anyhow::Result<()> {
        self.seen.lock().push(ev.clone());
        Ok(())
    }
}

impl Collecting {
    pub fn texts_for(&self, source: &str) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.text.clone())
            .collect()
    }
}
