use lazy_static::lazy_static;
use prometheus::{core::Collector, opts, IntCounterVec, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref REGISTRY_ADAPTERS_TOTAL: IntGauge =
        IntGauge::new("sitelens_registry_adapters_total", "Registered adapters").unwrap();
    static ref REGISTRY_DETECTIONS: IntCounterVec = IntCounterVec::new(
        opts!(
            "sitelens_registry_detections_total",
            "Adapter lookups grouped by outcome"
        ),
        &["outcome"]
    )
    .unwrap();
    static ref REGISTRY_LIFECYCLE_FAILURES: IntCounterVec = IntCounterVec::new(
        opts!(
            "sitelens_registry_lifecycle_failures_total",
            "Adapter initialize/cleanup failures grouped by phase"
        ),
        &["phase"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register registry metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, REGISTRY_ADAPTERS_TOTAL.clone());
    register(registry, REGISTRY_DETECTIONS.clone());
    register(registry, REGISTRY_LIFECYCLE_FAILURES.clone());
}

pub fn set_adapter_count(count: usize) {
    REGISTRY_ADAPTERS_TOTAL.set(count as i64);
}

/// `outcome` is one of `matched`, `no_match` or `unregistered`.
pub fn record_lookup(outcome: &str) {
    REGISTRY_DETECTIONS.with_label_values(&[outcome]).inc();
}

pub fn record_lifecycle_failures(phase: &str, count: usize) {
    REGISTRY_LIFECYCLE_FAILURES
        .with_label_values(&[phase])
        .inc_by(count as u64);
}
