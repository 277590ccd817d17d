//! Application context: the explicit object every command threads through.

use std::sync::Arc;

use anyhow::{Context, Result};
use node_locator::{FallbackResolver, NodeResolver};
use perceiver_site::SiteDetector;
use site_adapters::{builtin_adapter, ConfiguredAdapter, SharedAdapter};
use sitelens_core_types::{DocumentHost, SharedClock};
use sitelens_registry::AdapterRegistry;
use tracing::{debug, info, warn};

use crate::config::Config;

pub struct AppContext {
    config: Arc<Config>,
    host: Arc<dyn DocumentHost>,
    clock: SharedClock,
    resolver: Arc<dyn NodeResolver>,
    registry: Arc<AdapterRegistry>,
}

impl AppContext {
    /// Build the registry for `host`: enabled built-ins first, then configured profiles,
    /// which replace a built-in with the same id.
    pub fn new(config: Config, host: Arc<dyn DocumentHost>, clock: SharedClock) -> Result<Self> {
        let resolver: Arc<dyn NodeResolver> = Arc::new(
            FallbackResolver::new(Arc::clone(&clock)).with_options(config.resolver.clone()),
        );
        let detector = SiteDetector::with_ttl(
            Arc::clone(&host),
            Arc::clone(&clock),
            config.detector.cache_ttl(),
        );
        let registry = Arc::new(AdapterRegistry::with_detector(detector));

        for id in &config.adapters.enabled {
            let Some(adapter) = builtin_adapter(
                id,
                Arc::clone(&host),
                Arc::clone(&resolver),
                Arc::clone(&clock),
            ) else {
                warn!(adapter = %id, "unknown built-in adapter; skipping");
                continue;
            };
            let adapter = adapter.with_context(|| format!("building built-in adapter `{id}`"))?;
            registry.register(adapter)?;
        }

        for profile in &config.profiles {
            let adapter: SharedAdapter = Arc::new(ConfiguredAdapter::from_config(
                profile,
                Arc::clone(&host),
                Arc::clone(&resolver),
                Arc::clone(&clock),
            )?);
            if registry.register_or_update(adapter).is_some() {
                debug!(site = %profile.id, "configured profile overrides built-in adapter");
            }
        }

        info!(adapters = registry.len(), "application context ready");
        Ok(Self {
            config: Arc::new(config),
            host,
            clock,
            resolver,
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn host(&self) -> &Arc<dyn DocumentHost> {
        &self.host
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn resolver(&self) -> &Arc<dyn NodeResolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }
}
