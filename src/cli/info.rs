use anyhow::{Context, Result};
use node_locator::ResolveOptions;
use perceiver_site::metrics::{self as detector_metrics, MetricSnapshot};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use sitelens_registry::metrics as registry_metrics;

use super::commands::InfoArgs;
use super::context::CliContext;
use super::output::emit;

#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub version: &'static str,
    pub build_date: &'static str,
    pub git_hash: &'static str,
    pub config_path: String,
    pub config_found: bool,
    pub adapters: Vec<String>,
    pub detector_cache_ttl_ms: u64,
    pub resolver: ResolveOptions,
    pub detector_metrics: MetricSnapshot,
}

pub async fn cmd_info(args: InfoArgs, ctx: &CliContext) -> Result<()> {
    let app = ctx.app_blank()?;
    let report = InfoReport {
        version: env!("CARGO_PKG_VERSION"),
        build_date: env!("BUILD_DATE"),
        git_hash: env!("GIT_HASH"),
        config_path: ctx.config_path().display().to_string(),
        config_found: ctx.config_found(),
        adapters: app
            .registry()
            .site_ids()
            .iter()
            .map(|id| id.to_string())
            .collect(),
        detector_cache_ttl_ms: app.config().detector.cache_ttl_ms,
        resolver: app.config().resolver.clone(),
        detector_metrics: detector_metrics::snapshot(),
    };
    emit(ctx.output(), &report, render_human)?;

    if args.metrics {
        let registry = prometheus::Registry::new();
        registry_metrics::register_metrics(&registry);
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        print!("{}", String::from_utf8_lossy(&buffer));
    }
    Ok(())
}

fn render_human(report: &InfoReport) -> String {
    let resolver = &report.resolver;
    let config_state = if report.config_found {
        ""
    } else {
        " (not found, using defaults)"
    };
    [
        "SiteLens System Information".to_string(),
        "===========================".to_string(),
        format!(
            "Version:        {} ({} {})",
            report.version, report.git_hash, report.build_date
        ),
        format!("Config:         {}{config_state}", report.config_path),
        format!("Adapters:       {}", report.adapters.join(", ")),
        format!("Detection TTL:  {}ms", report.detector_cache_ttl_ms),
        format!(
            "Resolver:       {} attempt(s), base {}ms (max {}ms), budget {}ms, backoff {}",
            resolver.max_attempts,
            resolver.base_delay_ms,
            resolver.max_delay_ms,
            resolver.max_timeout_ms,
            if resolver.exponential_backoff { "exponential" } else { "flat" }
        ),
        format!(
            "Detections:     {} ({} matched, cache hit rate {:.1}%)",
            report.detector_metrics.detect.total,
            report.detector_metrics.matched,
            report.detector_metrics.detect_cache.hit_rate
        ),
    ]
    .join("\n")
}
