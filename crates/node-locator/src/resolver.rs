//! Fallback chain orchestration

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sitelens_core_types::{DocumentHost, NodeHandle, SharedClock, SiteError};
use tracing::{debug, info, warn};

use crate::query::{is_interactable, is_visible, map_query_error};
use crate::types::{NodeResolution, NodeRoleSpec, ResolveOptions};

/// Node resolver trait
#[async_trait]
pub trait NodeResolver: Send + Sync {
    /// Resolve a role spec with the resolver's configured options
    async fn resolve(&self, host: &dyn DocumentHost, spec: &NodeRoleSpec) -> NodeResolution;

    /// Resolve a role spec with explicit options
    async fn resolve_with_options(
        &self,
        host: &dyn DocumentHost,
        spec: &NodeRoleSpec,
        options: &ResolveOptions,
    ) -> NodeResolution;
}

/// Outcome of a single query attempt.
enum Probe {
    Accepted(NodeHandle),
    Missing,
    Rejected(SiteError),
    Invalid(SiteError),
}

/// Default resolver: primary, then fallbacks in declared order, each retried with
/// backoff, all under one timeout budget.
pub struct FallbackResolver {
    clock: SharedClock,
    options: ResolveOptions,
}

impl FallbackResolver {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    fn elapsed_since(&self, started: Instant) -> Duration {
        self.clock.now().saturating_duration_since(started)
    }
}

fn probe(host: &dyn DocumentHost, spec: &NodeRoleSpec, expression: &str) -> Probe {
    let node = match host.query(expression) {
        Ok(Some(node)) => node,
        Ok(None) => return Probe::Missing,
        Err(err) => return Probe::Invalid(map_query_error(expression, err)),
    };
    if !is_visible(node.as_ref()) {
        return Probe::Rejected(SiteError::validation_failed(expression, "visible"));
    }
    if !is_interactable(node.as_ref()) {
        return Probe::Rejected(SiteError::validation_failed(expression, "interactable"));
    }
    if let Some(validator) = &spec.validator {
        if !validator.validate(node.as_ref()) {
            return Probe::Rejected(SiteError::validation_failed(expression, validator.name()));
        }
    }
    Probe::Accepted(node)
}

#[async_trait]
impl NodeResolver for FallbackResolver {
    async fn resolve(&self, host: &dyn DocumentHost, spec: &NodeRoleSpec) -> NodeResolution {
        self.resolve_with_options(host, spec, &self.options).await
    }

    async fn resolve_with_options(
        &self,
        host: &dyn DocumentHost,
        spec: &NodeRoleSpec,
        options: &ResolveOptions,
    ) -> NodeResolution {
        let started = self.clock.now();
        let budget = options.max_timeout();
        let max_attempts = options.max_attempts.max(1);
        let mut tried = Vec::with_capacity(spec.chain_len());
        let mut attempts = 0u32;
        let mut last_failure: Option<SiteError> = None;
        let mut budget_exhausted = false;

        debug!("Resolving {} ({} expressions)", spec.description, spec.chain_len());

        'chain: for (used, expression) in spec.expressions() {
            for attempt in 1..=max_attempts {
                // the first attempt always runs; the budget counts from it
                if attempts > 0 && self.elapsed_since(started) >= budget {
                    budget_exhausted = true;
                    break 'chain;
                }
                attempts += 1;
                if attempt == 1 {
                    tried.push(expression.to_string());
                }

                match probe(host, spec, expression) {
                    Probe::Accepted(node) => {
                        let elapsed = self.elapsed_since(started);
                        info!(
                            "Resolved {} via {} '{}' (attempt {}, {}ms)",
                            spec.description,
                            used,
                            expression,
                            attempt,
                            elapsed.as_millis()
                        );
                        return NodeResolution::found(node, used, expression, elapsed, attempts);
                    }
                    Probe::Invalid(err) => {
                        warn!("Skipping expression for {}: {}", spec.description, err);
                        last_failure = Some(err);
                        continue 'chain;
                    }
                    Probe::Missing => {
                        debug!("'{}' matched nothing (attempt {})", expression, attempt);
                    }
                    Probe::Rejected(err) => {
                        debug!("'{}' rejected (attempt {}): {}", expression, attempt, err);
                        last_failure = Some(err);
                    }
                }

                if attempt < max_attempts {
                    let remaining = budget.saturating_sub(self.elapsed_since(started));
                    let delay = options.delay_for(attempt).min(remaining);
                    if !delay.is_zero() {
                        self.clock.sleep(delay).await;
                    }
                }
            }
        }

        let elapsed = self.elapsed_since(started);
        let mut error = SiteError::element_not_found(spec.description.clone(), tried, elapsed);
        if budget_exhausted {
            error.message.push_str(&format!(
                "; {}ms budget exhausted",
                budget.as_millis()
            ));
        }
        if let Some(last) = last_failure {
            error.message.push_str(&format!("; last failure: {last}"));
        }
        warn!("{}", error);
        NodeResolution::not_found(error, elapsed, attempts)
    }
}
