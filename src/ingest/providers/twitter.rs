// src/ingest/providers/twitter.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::normalize_text;
use crate::ingest::types::{Event, EventKind, FetchAdapter, RawItem, SourceDescriptor};

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";
/// `since_id` a fresh poller starts with.
pub const INITIAL_SINCE_ID: u64 = 1;

#[derive(Debug, Deserialize)]
struct Tweet {
    id: u64,
    created_at: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    screen_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrors {
    pub(crate) errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) label: Option<String>,
    #[serde(default)]
    pub(crate) message: String,
}

impl ApiErrors {
    /// Only the first reported error is surfaced.
    pub(crate) fn into_fetch_error(self) -> FetchError {
        match self.errors.into_iter().next() {
            Some(e) => FetchError::Api {
                code: e.code,
                label: e.label,
                message: e.message,
            },
            None => FetchError::Payload("empty errors array".into()),
        }
    }
}

fn parse_created_at(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(ts, CREATED_AT_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn status_link(screen_name: &str, id: u64) -> String {
    format!("https://twitter.com/{screen_name}/status/{id}")
}

/// Parse a `user_timeline.json` body. Anything that is neither an error
/// object nor an array of tweets counts as "no items".
pub fn parse_timeline(body: &str) -> Result<Vec<RawItem<u64>>, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(trimmed)?;

    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        v @ serde_json::Value::Object(_) if v.get("errors").is_some() => {
            let errs: ApiErrors = serde_json::from_value(v)?;
            return Err(errs.into_fetch_error());
        }
        _ => return Ok(Vec::new()),
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let tweet: Tweet = match serde_json::from_value(entry) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed tweet");
                continue;
            }
        };
        let Some(created_at) = parse_created_at(&tweet.created_at) else {
            tracing::debug!(id = tweet.id, created_at = %tweet.created_at, "unparseable created_at");
            continue;
        };
        let text_raw = tweet.full_text.or(tweet.text).unwrap_or_default();
        out.push(RawItem {
            key: tweet.id,
            link: status_link(&tweet.user.screen_name, tweet.id),
            author: Some(tweet.user.screen_name),
            title: None,
            text: normalize_text(&text_raw),
            created_at,
        });
    }
    Ok(out)
}

/// Polls `statuses/user_timeline` for the handle in `SourceDescriptor::endpoint`.
pub struct TwitterTimelineAdapter {
    client: reqwest::Client,
    api_base: String,
    cutoff: DateTime<Utc>,
}

impl TwitterTimelineAdapter {
    /// Tweets created before `started_at - grace` are dropped.
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        started_at: DateTime<Utc>,
        grace: ChronoDuration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            cutoff: started_at - grace,
        }
    }
}

#[async_trait]
impl FetchAdapter for TwitterTimelineAdapter {
    type Key = u64;

    fn kind(&self) -> &'static str {
        "twitter"
    }

    fn initial_watermark(&self, _started_at: DateTime<Utc>) -> u64 {
        INITIAL_SINCE_ID
    }

    async fn fetch(
        &self,
        source: &SourceDescriptor,
        since: u64,
    ) -> Result<Vec<RawItem<u64>>, FetchError> {
        let token = source
            .credential
            .as_ref()
            .ok_or_else(|| FetchError::MissingCredential(source.name.clone()))?;

        let url = format!("{}/statuses/user_timeline.json", self.api_base);
        let since_id = since.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("screen_name", source.endpoint.as_str()),
                ("since_id", since_id.as_str()),
            ])
            .bearer_auth(token.secret())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        // Error payloads come with a non-2xx status; prefer their message.
        let items = parse_timeline(&body)?;
        if !status.is_success() {
            return Err(FetchError::Api {
                code: i64::from(status.as_u16()),
                label: None,
                message: format!("GET {url} returned {status}"),
            });
        }
        Ok(items)
    }

    fn is_relevant(&self, item: &RawItem<u64>) -> bool {
        item.created_at > self.cutoff
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
