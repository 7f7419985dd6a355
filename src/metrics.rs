use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

/// Install the Prometheus recorder with its own HTTP listener when
/// `METRICS_ADDR` is set (e.g. `127.0.0.1:9000`). Must run inside the runtime.
pub fn install_from_env() -> Result<Option<SocketAddr>> {
    let Some(raw) = std::env::var(ENV_METRICS_ADDR)
        .ok()
        .filter(|v| !v.trim().is_empty())
    else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid {ENV_METRICS_ADDR}: {raw}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;

    crate::ingest::ensure_metrics_described();
    Ok(Some(addr))
}
