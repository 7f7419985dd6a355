// src/config/slurper.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::auth::DEFAULT_TOKEN_URL;
use crate::ingest::directory::DEFAULT_DIRECTORY_URL;
use crate::ingest::providers::mediawiki::DEFAULT_DIFF_MARKER;
use crate::ingest::providers::twitter::DEFAULT_API_BASE;

pub const ENV_CONFIG_PATH: &str = "SLURPER_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/slurper.toml";
pub const DEFAULT_JSON_PATH: &str = "config/slurper.json";

const MAX_GRACE_SECS: u64 = 30 * 24 * 3600;

pub const ENV_TWITTER_KEY: &str = "TWITTER_CONSUMER_KEY";
pub const ENV_TWITTER_SECRET: &str = "TWITTER_CONSUMER_SECRET";

fn default_grace_secs() -> u64 {
    30 * 60
}
fn default_http_timeout_secs() -> u64 {
    30
}
fn default_recv_timeout_ms() -> u64 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterCfg {
    pub interval_secs: u64,
    pub pause_secs: f64,
    pub directory_url: String,
    pub api_base: String,
    pub token_url: String,
    /// Per-space SpaceAPI request timeout.
    pub space_timeout_ms: u64,
}

impl Default for TwitterCfg {
    fn default() -> Self {
        Self {
            interval_secs: 200,
            pause_secs: 0.1,
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            space_timeout_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiSource {
    pub name: String,
    pub url: String,
}

impl WikiSource {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Hackerspace wikis in the BeNeLux.
pub fn default_wikis() -> Vec<WikiSource> {
    vec![
        // Belgium
        WikiSource::new("UrlLab", "http://urlab.be/"),
        WikiSource::new("Void Warranties", "http://www.voidwarranties.be/index.php/"),
        WikiSource::new("WhiteSpace", "http://www.0x20.be/"),
        // Luxembourg
        WikiSource::new("syn2cat", "http://wiki.hackerspace.lu/wiki/"),
        // Netherlands
        WikiSource::new("ACKspace", "https://ackspace.nl/wiki/"),
        WikiSource::new("Bitlair", "https://wiki.bitlair.nl/Pages/"),
        WikiSource::new("Frack", "https://frack.nl/wiki/"),
        WikiSource::new("Hack42", "https://hack42.nl/wiki/"),
        WikiSource::new("NURDSpace", "http://nurdspace.nl/"),
        WikiSource::new("RevSpace", "https://revspace.nl/"),
        WikiSource::new("Sk1llz", "http://wiki.sk1llz.nl/"),
        WikiSource::new("Technologia Incognita", "http://wiki.techinc.nl/index.php/"),
        WikiSource::new("TkkrLab", "http://tkkrlab.nl/wiki/"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiCfg {
    pub interval_secs: u64,
    pub pause_secs: f64,
    pub diff_marker: String,
    pub sources: Vec<WikiSource>,
}

impl Default for WikiCfg {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            pause_secs: 2.0,
            diff_marker: DEFAULT_DIFF_MARKER.to_string(),
            sources: default_wikis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSection {
    pub recv_timeout_ms: u64,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        Self {
            recv_timeout_ms: default_recv_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlurperConfig {
    /// Items older than process start minus this window are never shown.
    pub startup_grace_secs: u64,
    pub http_timeout_secs: u64,
    pub twitter: TwitterCfg,
    pub wiki: WikiCfg,
    pub consumer: ConsumerSection,
}

impl Default for SlurperConfig {
    fn default() -> Self {
        Self {
            startup_grace_secs: default_grace_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            twitter: TwitterCfg::default(),
            wiki: WikiCfg::default(),
            consumer: ConsumerSection::default(),
        }
    }
}

impl SlurperConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $SLURPER_CONFIG_PATH
    /// 2) config/slurper.toml
    /// 3) config/slurper.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    pub fn startup_grace(&self) -> chrono::Duration {
        let secs = self.startup_grace_secs.min(MAX_GRACE_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.consumer.recv_timeout_ms)
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = defaults.http_timeout_secs;
        }
        if self.consumer.recv_timeout_ms == 0 {
            self.consumer.recv_timeout_ms = default_recv_timeout_ms();
        }
        if self.twitter.interval_secs == 0 {
            self.twitter.interval_secs = defaults.twitter.interval_secs;
        }
        if self.wiki.interval_secs == 0 {
            self.wiki.interval_secs = defaults.wiki.interval_secs;
        }
        self.twitter.pause_secs = sanitize_pause(self.twitter.pause_secs);
        self.wiki.pause_secs = sanitize_pause(self.wiki.pause_secs);
        if self.twitter.space_timeout_ms == 0 {
            self.twitter.space_timeout_ms = defaults.twitter.space_timeout_ms;
        }
        if self.wiki.diff_marker.trim().is_empty() {
            self.wiki.diff_marker = DEFAULT_DIFF_MARKER.to_string();
        }
        self.wiki.sources = clean_wikis(self.wiki.sources);
        self
    }
}

/// Negative or non-finite pauses become zero.
pub fn sanitize_pause(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}

fn normalize_wiki_base(url: &str) -> String {
    let mut u = url.trim().to_string();
    if !u.contains("://") {
        u = format!("https://{u}");
    }
    if !u.ends_with('/') {
        u.push('/');
    }
    u
}

/// Drop blank entries and duplicate names (first wins), normalize base URLs.
fn clean_wikis(items: Vec<WikiSource>) -> Vec<WikiSource> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let name = it.name.trim();
        if name.is_empty() || it.url.trim().is_empty() {
            continue;
        }
        if !seen.insert(name.to_string()) {
            tracing::warn!(wiki = %name, "duplicate wiki name in config, keeping the first");
            continue;
        }
        out.push(WikiSource {
            name: name.to_string(),
            url: normalize_wiki_base(&it.url),
        });
    }
    out
}

fn from_toml(s: &str) -> Result<SlurperConfig> {
    Ok(toml::from_str(s)?)
}

fn from_json(s: &str) -> Result<SlurperConfig> {
    Ok(serde_json::from_str(s)?)
}

type ConfigParser = fn(&str) -> Result<SlurperConfig>;

/// Parses with the format the extension names, then tries the other one.
/// When both fail, the error of the named format is reported.
fn parse_config(s: &str, hint_ext: &str) -> Result<SlurperConfig> {
    let (format, primary, fallback): (&str, ConfigParser, ConfigParser) = if hint_ext == "json" {
        ("json", from_json, from_toml)
    } else {
        ("toml", from_toml, from_json)
    };
    let cfg = match primary(s) {
        Ok(cfg) => cfg,
        Err(e) => fallback(s).map_err(|_| e.context(format!("invalid {format} config")))?,
    };
    Ok(cfg.sanitized())
}

/// Application-only credentials for the timeline API.
#[derive(Clone)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .finish()
    }
}

impl TwitterCredentials {
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("Missing {name} env var"))
        };
        Ok(Self {
            consumer_key: read(ENV_TWITTER_KEY)?,
            consumer_secret: read(ENV_TWITTER_SECRET)?,
        })
    }
}
