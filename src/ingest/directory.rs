// src/ingest/directory.rs
//! SpaceAPI directory: `{space name -> api url}`, then one status document
//! per space. Read once at startup.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::ingest::types::SourceDescriptor;

pub const DEFAULT_DIRECTORY_URL: &str = "http://openspace.slopjong.de/directory.json";
pub const DEFAULT_SPACE_TIMEOUT: Duration = Duration::from_secs(1);

/// Space name plus its SpaceAPI document, in deterministic order.
pub type SpaceSnapshot = Vec<(String, Value)>;

/// Fetch the directory itself. Failure here is fatal to startup.
pub async fn fetch_directory(client: &reqwest::Client, url: &str) -> Result<BTreeMap<String, String>> {
    let raw: BTreeMap<String, Value> = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetching space directory {url}"))?
        .error_for_status()
        .context("space directory non-2xx")?
        .json()
        .await
        .context("space directory is not a JSON object")?;

    let mut out = BTreeMap::new();
    for (name, api) in raw {
        match api.as_str() {
            Some(u) => {
                out.insert(name, u.to_string());
            }
            None => tracing::warn!(space = %name, "directory entry has no API url, skipping"),
        }
    }
    Ok(out)
}

/// Status document for one space, or `None` (logged) when unavailable.
pub async fn fetch_space_info(
    client: &reqwest::Client,
    name: &str,
    api_url: &str,
    timeout: Duration,
) -> Option<Value> {
    let resp = match client.get(api_url).timeout(timeout).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(space = %name, error = %e, "could not request space status");
            return None;
        }
    };
    match resp.json::<Value>().await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(space = %name, error = %e, "space API response is not JSON");
            None
        }
    }
}

/// Directory plus every reachable space document, sorted by name.
pub async fn all_space_info(
    client: &reqwest::Client,
    directory_url: &str,
    timeout: Duration,
) -> Result<SpaceSnapshot> {
    let directory = fetch_directory(client, directory_url).await?;
    tracing::info!(spaces = directory.len(), "space directory loaded");

    let mut set = JoinSet::new();
    for (name, api_url) in directory {
        let client = client.clone();
        set.spawn(async move {
            let info = fetch_space_info(&client, &name, &api_url, timeout).await;
            (name, info)
        });
    }

    let mut spaces = BTreeMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, Some(info))) => {
                spaces.insert(name, info);
            }
            Ok((_, None)) => {}
            Err(e) => tracing::warn!(error = %e, "space status task failed"),
        }
    }
    Ok(sorted_snapshot(spaces))
}

/// Case-insensitive name order, ties broken by exact name.
pub fn sorted_snapshot(spaces: BTreeMap<String, Value>) -> SpaceSnapshot {
    let mut out: SpaceSnapshot = spaces.into_iter().collect();
    out.sort_by(|(a, _), (b, _)| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));
    out
}

/// `contact.twitter` of a SpaceAPI document, without a leading `@`.
pub fn twitter_handle(info: &Value) -> Option<String> {
    let handle = info.get("contact")?.get("twitter")?.as_str()?.trim();
    let handle = handle.trim_start_matches('@');
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

/// One timeline source per space that lists a Twitter contact.
pub fn twitter_sources(spaces: &[(String, Value)]) -> Vec<SourceDescriptor> {
    spaces
        .iter()
        .filter_map(|(name, info)| {
            twitter_handle(info).map(|handle| SourceDescriptor::new(name.clone(), handle))
        })
        .collect()
}
