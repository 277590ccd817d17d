//! Node query utilities shared by the resolver and the adapters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sitelens_core_types::{
    Clock, DocumentHost, DomNode, NodeHandle, QueryError, SharedClock, SiteError, SiteResult,
};
use tokio::sync::Notify;
use tracing::debug;

/// Whether the node is rendered and takes up space.
pub fn is_visible(node: &dyn DomNode) -> bool {
    if !node.is_connected() {
        return false;
    }
    let style = node.computed_style();
    if style.display == "none" {
        return false;
    }
    if matches!(style.visibility.as_str(), "hidden" | "collapse") {
        return false;
    }
    if style.opacity <= 0.0 {
        return false;
    }
    !node.bounding_rect().is_empty()
}

/// Whether the user could interact with the node.
pub fn is_interactable(node: &dyn DomNode) -> bool {
    if node.has_attribute("disabled") || node.has_attribute("inert") {
        return false;
    }
    if node.attribute("aria-disabled").as_deref() == Some("true")
        || node.attribute("aria-hidden").as_deref() == Some("true")
    {
        return false;
    }
    node.computed_style().pointer_events != "none"
}

pub(crate) fn map_query_error(expression: &str, err: QueryError) -> SiteError {
    match err {
        QueryError::InvalidExpression { reason, .. } => SiteError::selector_invalid(expression, reason),
        QueryError::Host(reason) => SiteError::selector_invalid(expression, reason),
    }
}

/// Wait until `expression` matches a node or `timeout` elapses.
///
/// The document is re-queried only when the host reports a structural change, so the
/// wait costs nothing while the page is idle. The change subscription is detached when
/// the wait returns or its future is dropped.
pub async fn wait_for_node(
    host: &dyn DocumentHost,
    clock: &dyn Clock,
    expression: &str,
    timeout: Duration,
) -> SiteResult<NodeHandle> {
    let started = clock.now();
    let changed = Arc::new(Notify::new());
    let waker = Arc::clone(&changed);
    let _subscription = host.subscribe(
        None,
        Arc::new(move |_event| {
            waker.notify_one();
        }),
    );

    loop {
        match host.query(expression) {
            Ok(Some(node)) => return Ok(node),
            Ok(None) => {}
            Err(err) => return Err(map_query_error(expression, err)),
        }

        let elapsed = clock.now().saturating_duration_since(started);
        if elapsed >= timeout {
            debug!(expression, ?elapsed, "wait_for_node budget exhausted");
            return Err(SiteError::timeout(format!("waiting for '{expression}'"), timeout)
                .with_selectors(vec![expression.to_string()])
                .with_elapsed(elapsed));
        }

        tokio::select! {
            _ = changed.notified() => {}
            _ = clock.sleep(timeout - elapsed) => {}
        }
    }
}

/// Leading-edge rate limiter: at most one pass per interval.
pub struct Throttle {
    interval: Duration,
    clock: SharedClock,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration, clock: SharedClock) -> Self {
        Self {
            interval,
            clock,
            last: Mutex::new(None),
        }
    }

    /// Returns `true` (and records the pass) when the interval since the last pass elapsed.
    pub fn try_pass(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}

/// Trailing-edge debouncer: only the last call within a quiet window proceeds.
pub struct Debouncer {
    delay: Duration,
    clock: SharedClock,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration, clock: SharedClock) -> Self {
        Self {
            delay,
            clock,
            generation: AtomicU64::new(0),
        }
    }

    /// Sleep for the debounce delay; `true` when no newer call arrived meanwhile.
    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.clock.sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }
}
