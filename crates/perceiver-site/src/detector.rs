//! Confidence-scored environment detection.
//!
//! Score per profile = URL match (0.7) + fraction of satisfied structural markers (× 0.3)
//! + the adapter's own boost (≤ 0.2), clamped to `[0, 1]`. Structural evidence is only
//! gathered for profiles whose URL patterns match. The best profile wins, ties going to
//! the one declared first, and only scores above 0.5 count as a match.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use sitelens_core_types::{
    DetectionResult, DetectionSignals, DocumentHost, SharedClock, SiteId,
};
use tracing::{debug, warn};
use url::Url;

use crate::cache::{DetectionCache, DEFAULT_DETECTION_TTL};
use crate::metrics;
use crate::profile::EnvironmentProfile;

pub const URL_WEIGHT: f64 = 0.7;
pub const STRUCTURAL_WEIGHT: f64 = 0.3;
pub const MAX_BOOST: f64 = 0.2;

/// Profile-specific confidence contributor supplied by an adapter.
pub trait ConfidenceBoost: Send + Sync {
    /// Raw boost; clamped to `[0, MAX_BOOST]` by the detector.
    fn boost(&self, host: &dyn DocumentHost) -> f64;
}

#[derive(Clone)]
struct ProfileEntry {
    profile: Arc<EnvironmentProfile>,
    boost: Option<Arc<dyn ConfidenceBoost>>,
}

/// Score a single profile against `url` and the current document.
pub fn score_profile(
    host: &dyn DocumentHost,
    profile: &EnvironmentProfile,
    boost: Option<&dyn ConfidenceBoost>,
    url: &str,
) -> DetectionSignals {
    if !profile.matches_url(url) {
        return DetectionSignals::default();
    }

    let markers = profile.markers();
    let structural_score = if markers.is_empty() {
        0.0
    } else {
        let satisfied = markers
            .iter()
            .filter(|marker| match marker.evaluate(host) {
                Ok(hit) => hit,
                Err(err) => {
                    warn!(
                        profile = %profile.id(),
                        marker = %marker.describe(),
                        %err,
                        "marker check failed; skipping"
                    );
                    metrics::record_marker_error();
                    false
                }
            })
            .count();
        STRUCTURAL_WEIGHT * satisfied as f64 / markers.len() as f64
    };

    let boost = boost
        .map(|boost| boost.boost(host))
        .filter(|value| !value.is_nan())
        .unwrap_or(0.0)
        .clamp(0.0, MAX_BOOST);

    DetectionSignals {
        url_score: URL_WEIGHT,
        structural_score,
        boost,
    }
}

pub struct SiteDetector {
    host: Arc<dyn DocumentHost>,
    clock: SharedClock,
    entries: RwLock<Vec<ProfileEntry>>,
    cache: DetectionCache,
}

impl SiteDetector {
    pub fn new(host: Arc<dyn DocumentHost>, clock: SharedClock) -> Self {
        Self::with_ttl(host, clock, DEFAULT_DETECTION_TTL)
    }

    pub fn with_ttl(host: Arc<dyn DocumentHost>, clock: SharedClock, ttl: Duration) -> Self {
        Self {
            cache: DetectionCache::new(ttl, Arc::clone(&clock)),
            host,
            clock,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn host(&self) -> &Arc<dyn DocumentHost> {
        &self.host
    }

    pub fn cache(&self) -> &DetectionCache {
        &self.cache
    }

    /// Add a profile, or replace one with the same id in place (declaration order is kept).
    /// Returns `true` when an existing profile was replaced.
    pub fn register_profile(
        &self,
        profile: Arc<EnvironmentProfile>,
        boost: Option<Arc<dyn ConfidenceBoost>>,
    ) -> bool {
        let entry = ProfileEntry { profile, boost };
        let replaced = {
            let mut entries = self.entries.write();
            match entries
                .iter_mut()
                .find(|existing| existing.profile.id() == entry.profile.id())
            {
                Some(existing) => {
                    *existing = entry;
                    true
                }
                None => {
                    entries.push(entry);
                    false
                }
            }
        };
        self.cache.clear();
        replaced
    }

    pub fn remove_profile(&self, id: &SiteId) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|entry| entry.profile.id() != id);
            entries.len() != before
        };
        if removed {
            self.cache.clear();
        }
        removed
    }

    pub fn clear_profiles(&self) {
        self.entries.write().clear();
        self.cache.clear();
    }

    pub fn profiles(&self) -> Vec<Arc<EnvironmentProfile>> {
        self.entries
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.profile))
            .collect()
    }

    pub fn profile(&self, id: &SiteId) -> Option<Arc<EnvironmentProfile>> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.profile.id() == id)
            .map(|entry| Arc::clone(&entry.profile))
    }

    /// Detect which profile `url` (default: the host's current URL) belongs to.
    pub fn detect(&self, url: Option<&str>) -> DetectionResult {
        let started = self.clock.now();
        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| self.host.current_url());

        if let Some(cached) = self.cache.get(&url) {
            debug!(%url, site = ?cached.site, "detection cache hit");
            metrics::record_detect(true, cached.is_match(), self.elapsed_since(started));
            return cached;
        }

        if let Err(err) = Url::parse(&url) {
            debug!(%url, %err, "malformed url; reporting no match");
            metrics::record_detect(false, false, self.elapsed_since(started));
            return DetectionResult::no_match(url);
        }

        let entries = self.entries.read().clone();
        let mut best: Option<(SiteId, DetectionSignals)> = None;
        for entry in &entries {
            let signals = score_profile(
                self.host.as_ref(),
                &entry.profile,
                entry.boost.as_deref(),
                &url,
            );
            debug!(
                profile = %entry.profile.id(),
                url_score = signals.url_score,
                structural = signals.structural_score,
                boost = signals.boost,
                "profile scored"
            );
            let better = match &best {
                Some((_, current)) => signals.total() > current.total(),
                None => true,
            };
            if better {
                best = Some((entry.profile.id().clone(), signals));
            }
        }

        let result = match best {
            Some((site, signals)) => {
                let candidate = DetectionResult::matched(url.clone(), site, signals);
                if candidate.is_match() {
                    candidate
                } else {
                    DetectionResult {
                        site: None,
                        ..candidate
                    }
                }
            }
            None => DetectionResult::no_match(url.clone()),
        };

        if result.is_match() {
            self.cache.put(url, result.clone());
        }
        metrics::record_detect(false, result.is_match(), self.elapsed_since(started));
        result
    }

    pub fn invalidate(&self, url: &str) {
        self.cache.invalidate(url);
    }

    fn elapsed_since(&self, started: std::time::Instant) -> Duration {
        self.clock.now().saturating_duration_since(started)
    }
}
