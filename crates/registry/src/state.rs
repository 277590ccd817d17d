use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use perceiver_site::{EnvironmentProfile, SiteDetector};
use site_adapters::{AdapterState, SharedAdapter};
use sitelens_core_types::{DetectionResult, DocumentHost, SharedClock, SiteError, SiteId};
use tracing::{debug, info, warn};

use crate::{api::SiteRegistry, errors::RegistryError, metrics};

/// Maps profile ids to adapters and drives detect → select → initialize.
pub struct AdapterRegistry {
    adapters: DashMap<SiteId, SharedAdapter>,
    detector: SiteDetector,
    initialized: AtomicBool,
    init_lock: tokio::sync::Mutex<()>,
}

impl AdapterRegistry {
    pub fn new(host: Arc<dyn DocumentHost>, clock: SharedClock) -> Self {
        Self::with_detector(SiteDetector::new(host, clock))
    }

    pub fn with_detector(detector: SiteDetector) -> Self {
        Self {
            adapters: DashMap::new(),
            detector,
            initialized: AtomicBool::new(false),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn detector(&self) -> &SiteDetector {
        &self.detector
    }

    /// Fails with [`RegistryError::Duplicate`] when the id is taken.
    pub fn register(&self, adapter: SharedAdapter) -> Result<(), RegistryError> {
        let id = adapter.site_id().clone();
        match self.adapters.entry(id.clone()) {
            Entry::Occupied(_) => {
                warn!(site = %id, "duplicate adapter registration rejected");
                return Err(RegistryError::Duplicate(id));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&adapter));
            }
        }
        self.track(&adapter);
        info!(site = %id, "adapter registered");
        Ok(())
    }

    /// Register, replacing any adapter with the same id. The displaced adapter is handed
    /// back so the caller can clean it up.
    pub fn register_or_update(&self, adapter: SharedAdapter) -> Option<SharedAdapter> {
        let id = adapter.site_id().clone();
        let previous = self.adapters.insert(id.clone(), Arc::clone(&adapter));
        self.track(&adapter);
        if previous.is_some() {
            info!(site = %id, "adapter replaced");
        } else {
            info!(site = %id, "adapter registered");
        }
        previous
    }

    /// Make a profile detectable without serving it. Matching it makes `get_adapter` fail
    /// with `SITE_NOT_DETECTED` until an adapter is registered for it.
    pub fn declare_profile(&self, profile: Arc<EnvironmentProfile>) {
        debug!(site = %profile.id(), "profile declared");
        self.detector.register_profile(profile, None);
    }

    pub fn detect_site(&self, url: Option<&str>) -> DetectionResult {
        self.detector.detect(url)
    }

    pub fn get_adapter(&self, url: Option<&str>) -> Result<Option<SharedAdapter>, RegistryError> {
        let detection = self.detector.detect(url);
        let Some(site) = detection.site.clone().filter(|_| detection.is_match()) else {
            metrics::record_lookup("no_match");
            return Ok(None);
        };
        match self.adapters.get(&site) {
            Some(adapter) => {
                metrics::record_lookup("matched");
                Ok(Some(Arc::clone(adapter.value())))
            }
            None => {
                metrics::record_lookup("unregistered");
                warn!(%site, confidence = detection.confidence, "matched profile has no adapter");
                Err(SiteError::site_not_detected(detection).with_site(site).into())
            }
        }
    }

    pub fn adapter(&self, id: &SiteId) -> Option<SharedAdapter> {
        self.adapters.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Ids with a registered adapter, in profile declaration order.
    pub fn site_ids(&self) -> Vec<SiteId> {
        self.detector
            .profiles()
            .iter()
            .map(|profile| profile.id().clone())
            .filter(|id| self.adapters.contains_key(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Start every pending `initialize()` together and wait for all of them. Successes are
    /// kept even when others fail; a repeat call after full success does nothing.
    pub async fn initialize_all(&self) -> Result<(), RegistryError> {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            debug!("all adapters already initialized");
            return Ok(());
        }

        let pending: Vec<SharedAdapter> = self
            .snapshot()
            .into_iter()
            .filter(|adapter| adapter.state() != AdapterState::Initialized)
            .collect();
        info!(count = pending.len(), "initializing adapters");

        let outcomes = join_all(pending.iter().map(|adapter| async move {
            (adapter.site_id().clone(), adapter.initialize().await)
        }))
        .await;
        let failures: Vec<(SiteId, SiteError)> = outcomes
            .into_iter()
            .filter_map(|(site, outcome)| outcome.err().map(|err| (site, err)))
            .collect();

        if !failures.is_empty() {
            metrics::record_lifecycle_failures("initialize", failures.len());
            warn!(failed = failures.len(), "adapter initialization incomplete");
            return Err(RegistryError::Initialization { failures });
        }

        // an adapter registered meanwhile keeps the flag down
        let complete = self
            .adapters
            .iter()
            .all(|entry| entry.value().state() == AdapterState::Initialized);
        self.initialized.store(complete, Ordering::Release);
        Ok(())
    }

    /// Clean up every adapter, best-effort. Entries stay registered.
    pub async fn cleanup_all(&self) -> Result<(), RegistryError> {
        self.initialized.store(false, Ordering::Release);
        let adapters = self.snapshot();
        Self::cleanup_each(adapters).await
    }

    /// Remove an adapter (and its profile) and clean it up. `Ok(false)` when no adapter is
    /// registered under `id`; a profile only declared with `declare_profile` stays.
    pub async fn unregister(&self, id: &SiteId) -> Result<bool, RegistryError> {
        let Some((_, adapter)) = self.adapters.remove(id) else {
            return Ok(false);
        };
        self.detector.remove_profile(id);
        metrics::set_adapter_count(self.adapters.len());
        info!(site = %id, "adapter unregistered");
        Self::cleanup_each(vec![adapter]).await?;
        Ok(true)
    }

    /// Drop every adapter and declared profile, cleaning up each adapter best-effort.
    pub async fn clear(&self) -> Result<(), RegistryError> {
        self.initialized.store(false, Ordering::Release);
        let adapters = self.snapshot();
        self.adapters.clear();
        self.detector.clear_profiles();
        metrics::set_adapter_count(0);
        info!(count = adapters.len(), "registry cleared");
        Self::cleanup_each(adapters).await
    }

    fn track(&self, adapter: &SharedAdapter) {
        self.detector
            .register_profile(Arc::clone(adapter.profile()), adapter.confidence_boost());
        self.initialized.store(false, Ordering::Release);
        metrics::set_adapter_count(self.adapters.len());
    }

    fn snapshot(&self) -> Vec<SharedAdapter> {
        self.adapters
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    async fn cleanup_each(adapters: Vec<SharedAdapter>) -> Result<(), RegistryError> {
        let mut failures = Vec::new();
        for adapter in adapters {
            if let Err(err) = adapter.cleanup().await {
                warn!(site = %adapter.site_id(), %err, "adapter cleanup failed");
                failures.push((adapter.site_id().clone(), err));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            metrics::record_lifecycle_failures("cleanup", failures.len());
            Err(RegistryError::Cleanup { failures })
        }
    }
}

#[async_trait]
impl SiteRegistry for AdapterRegistry {
    fn detect_site(&self, url: Option<&str>) -> DetectionResult {
        AdapterRegistry::detect_site(self, url)
    }

    fn get_adapter(&self, url: Option<&str>) -> Result<Option<SharedAdapter>, RegistryError> {
        AdapterRegistry::get_adapter(self, url)
    }

    fn site_ids(&self) -> Vec<SiteId> {
        AdapterRegistry::site_ids(self)
    }

    async fn initialize_all(&self) -> Result<(), RegistryError> {
        AdapterRegistry::initialize_all(self).await
    }

    async fn cleanup_all(&self) -> Result<(), RegistryError> {
        AdapterRegistry::cleanup_all(self).await
    }
}
