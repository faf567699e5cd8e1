//! Prometheus metrics export.
//!
//! The core library owns the metric statics; this module registers them in
//! a registry and renders the text exposition format for `--metrics-out`.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in discoder_core::metrics::all_metrics() {
        if let Err(e) = registry.register(metric) {
            warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_core_metrics() {
        discoder_core::metrics::PIPELINES_TOTAL
            .with_label_values(&["success"])
            .inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("discoder_pipelines_total"));
    }
}
