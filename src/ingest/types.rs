// src/ingest/types.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::ingest::error::FetchError;

/// Opaque access credential (bearer token). Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted, {} chars>)", self.0.len())
    }
}

/// One pollable source. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,     // unique within a run, e.g. "Frack"
    pub endpoint: String, // twitter handle or wiki base URL
    pub credential: Option<Credential>,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }
}

/// Whatever an adapter returns, before filtering. `key` is the source's own
/// ordering key (tweet id, change timestamp).
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem<K> {
    pub key: K,
    pub author: Option<String>,
    pub title: Option<String>,
    pub text: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A timeline post.
    Post,
    /// A wiki edit; `article` links the edited page, `Event::link` the diff.
    Edit { article: String },
}

/// Normalized unit delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub source: String,
    pub link: String,
    pub occurred_at: DateTime<Utc>,
    pub text: String,
    pub author: Option<String>,
    pub title: Option<String>,
    pub kind: EventKind,
}

/// One implementation per source kind. The poller owns the watermark and
/// calls `fetch` once per cycle; the adapter only talks to the remote side.
#[async_trait]
pub trait FetchAdapter: Send + Sync {
    /// Native ordering key. Never mixed with another key type in one poller.
    type Key: Copy + Ord + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> &'static str;

    /// Watermark a fresh poller starts from, so the first cycle does not
    /// replay the source's history.
    fn initial_watermark(&self, started_at: DateTime<Utc>) -> Self::Key;

    async fn fetch(
        &self,
        source: &SourceDescriptor,
        since: Self::Key,
    ) -> Result<Vec<RawItem<Self::Key>>, FetchError>;

    /// Source-specific relevance filter, applied after the watermark moved.
    fn is_relevant(&self, item: &RawItem<Self::Key>) -> bool;

    fn to_event(&self, source: &SourceDescriptor, item: RawItem<Self::Key>) -> Event;
}
