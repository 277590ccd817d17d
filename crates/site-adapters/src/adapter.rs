//! The uniform capability surface every environment adapter exposes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use node_locator::{NodeResolution, NodeRole};
use perceiver_site::{score_profile, ConfidenceBoost, EnvironmentProfile};
use serde::Serialize;
use sitelens_core_types::{DetectionResult, SiteId, SiteResult};
use tokio::sync::broadcast;
use url::Url;

use crate::lifecycle::AdapterCore;

/// Lifecycle of an adapter. There is no way back from `CleanedUp`; build a new adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    Uninitialized,
    Initializing,
    Initialized,
    CleanedUp,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterState::Uninitialized => "uninitialized",
            AdapterState::Initializing => "initializing",
            AdapterState::Initialized => "initialized",
            AdapterState::CleanedUp => "cleaned_up",
        };
        f.write_str(name)
    }
}

/// Throttled notification that the adapter's document changed structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentChanged {
    pub site: SiteId,
    pub added_nodes: usize,
    pub removed_nodes: usize,
    pub attribute: Option<String>,
}

/// One adapter per supported environment profile.
///
/// Variants only have to hand out their [`AdapterCore`]; every capability has a default
/// built on it. Override `confidence_boost` to contribute profile-specific detection
/// evidence, and `initialize`/`cleanup` when the environment needs extra setup.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn core(&self) -> &AdapterCore;

    /// Extra detection evidence beyond the generic marker checks, clamped to 0.2.
    fn confidence_boost(&self) -> Option<Arc<dyn ConfidenceBoost>> {
        None
    }

    fn profile(&self) -> &Arc<EnvironmentProfile> {
        self.core().profile()
    }

    fn site_id(&self) -> &SiteId {
        self.core().profile().id()
    }

    /// Score the adapter's own profile against `url` (default: the current location).
    fn detect(&self, url: Option<&str>) -> DetectionResult {
        let core = self.core();
        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| core.host().current_url());
        if Url::parse(&url).is_err() {
            return DetectionResult::no_match(url);
        }
        let boost = self.confidence_boost();
        let signals = score_profile(core.host().as_ref(), core.profile(), boost.as_deref(), &url);
        let result = DetectionResult::matched(url, self.site_id().clone(), signals);
        if result.is_match() {
            result
        } else {
            DetectionResult {
                site: None,
                ..result
            }
        }
    }

    async fn find_input_element(&self) -> NodeResolution {
        self.core().find(NodeRole::Input).await
    }

    async fn find_submit_element(&self) -> NodeResolution {
        self.core().find(NodeRole::Submit).await
    }

    async fn find_chat_container(&self) -> NodeResolution {
        self.core().find(NodeRole::Container).await
    }

    async fn find_injection_point(&self) -> NodeResolution {
        self.core().find(NodeRole::InjectionPoint).await
    }

    /// Idempotent: a call while already initialized is a no-op.
    async fn initialize(&self) -> SiteResult<()> {
        self.core().initialize().await
    }

    async fn cleanup(&self) -> SiteResult<()> {
        self.core().cleanup();
        Ok(())
    }

    fn state(&self) -> AdapterState {
        self.core().state()
    }

    fn content_changes(&self) -> broadcast::Receiver<ContentChanged> {
        self.core().content_changes()
    }
}

pub type SharedAdapter = Arc<dyn SiteAdapter>;
