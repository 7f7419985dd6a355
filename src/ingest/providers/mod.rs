// src/ingest/providers/mod.rs
pub mod mediawiki;
pub mod twitter;

use anyhow::{Context, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("feed-slurper/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for all adapters of one run.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("building http client")
}
