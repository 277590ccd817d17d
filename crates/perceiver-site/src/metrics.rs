//! Telemetry helpers for site detection.
//!
//! Lightweight counters + latency aggregates so the CLI can surface basic metrics without
//! depending on an external metrics backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

static DETECT_TOTAL: AtomicU64 = AtomicU64::new(0);
static DETECT_MATCHED: AtomicU64 = AtomicU64::new(0);
static DETECT_CACHE_HIT: AtomicU64 = AtomicU64::new(0);
static DETECT_CACHE_MISS: AtomicU64 = AtomicU64::new(0);
static DETECT_LAT_NS: AtomicU64 = AtomicU64::new(0);
static DETECT_LAT_SAMPLES: AtomicU64 = AtomicU64::new(0);
static MARKER_ERRORS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricCounter {
    pub total: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheMetric {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSnapshot {
    pub detect: MetricCounter,
    pub matched: u64,
    pub detect_cache: CacheMetric,
    pub marker_errors: u64,
}

pub fn record_detect(cache_hit: bool, matched: bool, duration: Duration) {
    DETECT_TOTAL.fetch_add(1, Ordering::Relaxed);
    if matched {
        DETECT_MATCHED.fetch_add(1, Ordering::Relaxed);
    }
    if cache_hit {
        DETECT_CACHE_HIT.fetch_add(1, Ordering::Relaxed);
    } else {
        DETECT_CACHE_MISS.fetch_add(1, Ordering::Relaxed);
    }
    record_latency(&DETECT_LAT_NS, &DETECT_LAT_SAMPLES, duration);
}

pub fn record_marker_error() {
    MARKER_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricSnapshot {
    MetricSnapshot {
        detect: make_counter(
            DETECT_TOTAL.load(Ordering::Relaxed),
            DETECT_LAT_NS.load(Ordering::Relaxed),
            DETECT_LAT_SAMPLES.load(Ordering::Relaxed),
        ),
        matched: DETECT_MATCHED.load(Ordering::Relaxed),
        detect_cache: make_cache_metric(
            DETECT_CACHE_HIT.load(Ordering::Relaxed),
            DETECT_CACHE_MISS.load(Ordering::Relaxed),
        ),
        marker_errors: MARKER_ERRORS.load(Ordering::Relaxed),
    }
}

fn make_counter(total: u64, nanos: u64, samples: u64) -> MetricCounter {
    let avg_ms = if samples == 0 {
        0.0
    } else {
        (nanos as f64 / samples as f64) / 1_000_000.0
    };
    MetricCounter { total, avg_ms }
}

fn make_cache_metric(hits: u64, misses: u64) -> CacheMetric {
    let total = hits + misses;
    let hit_rate = if total == 0 {
        0.0
    } else {
        hits as f64 * 100.0 / total as f64
    };
    CacheMetric {
        hits,
        misses,
        hit_rate,
    }
}

fn record_latency(total_ns: &AtomicU64, samples: &AtomicU64, duration: Duration) {
    let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    total_ns.fetch_add(nanos, Ordering::Relaxed);
    samples.fetch_add(1, Ordering::Relaxed);
}
