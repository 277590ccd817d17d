//! Lifecycle and resolution plumbing shared by every adapter variant.

use std::sync::Arc;
use std::time::Duration;

use node_locator::{wait_for_node, NodeResolution, NodeResolver, NodeRole, Throttle};
use parking_lot::Mutex;
use perceiver_site::EnvironmentProfile;
use serde::{Deserialize, Serialize};
use sitelens_core_types::{
    DocumentHost, MutationEvent, MutationListener, ReadyState, SharedClock, SiteError, SiteId,
    SiteResult, Subscription,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterState, ContentChanged};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// How an adapter brings itself up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitSettings {
    /// Budget for the document to leave the `Loading` state.
    pub readiness_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Node whose presence signals the application shell has rendered.
    pub marker: Option<String>,
    pub marker_timeout_ms: u64,
    /// Fail initialization when the marker never shows up.
    pub marker_required: bool,
    /// Minimum spacing between two `ContentChanged` notifications.
    pub change_throttle_ms: u64,
}

impl Default for InitSettings {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: 10_000,
            poll_interval_ms: 100,
            marker: None,
            marker_timeout_ms: 5_000,
            marker_required: false,
            change_throttle_ms: 250,
        }
    }
}

impl InitSettings {
    pub fn with_marker(mut self, marker: impl Into<String>, required: bool) -> Self {
        self.marker = Some(marker.into());
        self.marker_required = required;
        self
    }

    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_marker_timeout(mut self, timeout: Duration) -> Self {
        self.marker_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout_ms)
    }

    pub fn change_throttle(&self) -> Duration {
        Duration::from_millis(self.change_throttle_ms)
    }
}

/// Everything an adapter needs to resolve nodes and run its lifecycle.
pub struct AdapterCore {
    profile: Arc<EnvironmentProfile>,
    host: Arc<dyn DocumentHost>,
    resolver: Arc<dyn NodeResolver>,
    clock: SharedClock,
    settings: InitSettings,
    state: Mutex<AdapterState>,
    subscription: Mutex<Option<Subscription>>,
    feed: Arc<ChangeFeed>,
    shutdown: CancellationToken,
    init_lock: tokio::sync::Mutex<()>,
}

impl AdapterCore {
    pub fn new(
        profile: Arc<EnvironmentProfile>,
        host: Arc<dyn DocumentHost>,
        resolver: Arc<dyn NodeResolver>,
        clock: SharedClock,
        settings: InitSettings,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let feed = Arc::new(ChangeFeed::new(
            profile.id().clone(),
            settings.change_throttle(),
            Arc::clone(&clock),
            shutdown.clone(),
        ));
        Self {
            profile,
            host,
            resolver,
            clock,
            settings,
            state: Mutex::new(AdapterState::Uninitialized),
            subscription: Mutex::new(None),
            feed,
            shutdown,
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn profile(&self) -> &Arc<EnvironmentProfile> {
        &self.profile
    }

    pub fn host(&self) -> &Arc<dyn DocumentHost> {
        &self.host
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn settings(&self) -> &InitSettings {
        &self.settings
    }

    pub fn state(&self) -> AdapterState {
        *self.state.lock()
    }

    /// Structural changes, at most one per throttle window plus a trailing one carrying
    /// whatever arrived while the window was closed.
    pub fn content_changes(&self) -> broadcast::Receiver<ContentChanged> {
        self.feed.sender.subscribe()
    }

    /// Resolve one of the profile's node roles. Errors carry the profile id.
    pub async fn find(&self, role: NodeRole) -> NodeResolution {
        let spec = self.profile.role(role);
        let mut resolution = self.resolver.resolve(self.host.as_ref(), spec).await;
        let site = self.profile.id();
        resolution.error = resolution
            .error
            .take()
            .map(|err| err.with_site(site.clone()));
        if !resolution.is_valid {
            debug!(%site, %role, "role not resolved");
        }
        resolution
    }

    pub async fn initialize(&self) -> SiteResult<()> {
        let _guard = self.init_lock.lock().await;
        let site = self.profile.id().clone();
        {
            let mut state = self.state.lock();
            match *state {
                AdapterState::Initialized => {
                    debug!(%site, "already initialized");
                    return Ok(());
                }
                AdapterState::CleanedUp => {
                    return Err(SiteError::initialization_failed(
                        &site,
                        "adapter was cleaned up; construct a new one",
                    ));
                }
                AdapterState::Uninitialized | AdapterState::Initializing => {
                    *state = AdapterState::Initializing;
                }
            }
        }
        info!(%site, "initializing adapter");

        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(SiteError::initialization_failed(
                &site,
                "cancelled by cleanup",
            )),
            result = self.prepare() => result,
        };

        let mut state = self.state.lock();
        match outcome {
            Ok(()) if !self.shutdown.is_cancelled() => {
                let subscription = self.host.subscribe(None, self.change_listener());
                *self.subscription.lock() = Some(subscription);
                *state = AdapterState::Initialized;
                info!(%site, "adapter initialized");
                Ok(())
            }
            Ok(()) => Err(SiteError::initialization_failed(
                &site,
                "cancelled by cleanup",
            )),
            Err(err) => {
                if *state == AdapterState::Initializing {
                    *state = AdapterState::Uninitialized;
                }
                warn!(%site, %err, "adapter initialization failed");
                Err(err)
            }
        }
    }

    /// Detach the change subscription and cancel any in-flight initialization.
    pub fn cleanup(&self) {
        self.shutdown.cancel();
        let mut state = self.state.lock();
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
        self.feed.discard_pending();
        let previous = *state;
        if previous != AdapterState::CleanedUp {
            info!(site = %self.profile.id(), %previous, "adapter cleaned up");
        }
        *state = AdapterState::CleanedUp;
    }

    async fn prepare(&self) -> SiteResult<()> {
        self.wait_until_ready().await?;

        let Some(marker) = self.settings.marker.as_deref() else {
            return Ok(());
        };
        let site = self.profile.id();
        match wait_for_node(
            self.host.as_ref(),
            self.clock.as_ref(),
            marker,
            self.settings.marker_timeout(),
        )
        .await
        {
            Ok(_) => {
                debug!(%site, marker, "marker present");
                Ok(())
            }
            Err(err) if self.settings.marker_required => Err(SiteError::initialization_failed(
                site,
                format!("marker '{marker}' unavailable: {err}"),
            )
            .with_selectors(vec![marker.to_string()])),
            Err(err) => {
                debug!(%site, marker, %err, "continuing without marker");
                Ok(())
            }
        }
    }

    async fn wait_until_ready(&self) -> SiteResult<()> {
        let started = self.clock.now();
        let budget = self.settings.readiness_timeout();
        loop {
            if self.host.ready_state() != ReadyState::Loading {
                return Ok(());
            }
            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= budget {
                return Err(SiteError::initialization_failed(
                    self.profile.id(),
                    format!("document still loading after {}ms", budget.as_millis()),
                )
                .with_elapsed(elapsed));
            }
            let pause = self.settings.poll_interval().min(budget - elapsed);
            self.clock.sleep(pause).await;
        }
    }

    fn change_listener(&self) -> MutationListener {
        let feed = Arc::clone(&self.feed);
        Arc::new(move |event: &MutationEvent| feed.publish(event))
    }
}

/// Leading-edge throttled change fan-out. Changes arriving inside a closed window are
/// merged and flushed once the window has passed.
struct ChangeFeed {
    site: SiteId,
    sender: broadcast::Sender<ContentChanged>,
    throttle: Throttle,
    window: Duration,
    clock: SharedClock,
    pending: Mutex<Option<ContentChanged>>,
    shutdown: CancellationToken,
}

impl ChangeFeed {
    fn new(site: SiteId, window: Duration, clock: SharedClock, shutdown: CancellationToken) -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            site,
            sender,
            throttle: Throttle::new(window, Arc::clone(&clock)),
            window,
            clock,
            pending: Mutex::new(None),
            shutdown,
        }
    }

    fn publish(self: &Arc<Self>, event: &MutationEvent) {
        let change = ContentChanged {
            site: self.site.clone(),
            added_nodes: event.added_nodes,
            removed_nodes: event.removed_nodes,
            attribute: event.attribute.clone(),
        };
        if self.throttle.try_pass() {
            // supersedes anything held back
            self.pending.lock().take();
            self.send(change);
            return;
        }

        let first_held = {
            let mut pending = self.pending.lock();
            match pending.as_mut() {
                Some(held) => {
                    held.added_nodes += change.added_nodes;
                    held.removed_nodes += change.removed_nodes;
                    if change.attribute.is_some() {
                        held.attribute = change.attribute;
                    }
                    false
                }
                None => {
                    *pending = Some(change);
                    true
                }
            }
        };
        if first_held {
            self.schedule_flush();
        }
    }

    fn schedule_flush(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(site = %self.site, "no runtime to flush held changes; dropping them");
            self.discard_pending();
            return;
        };
        let feed = Arc::clone(self);
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = feed.shutdown.cancelled() => {}
                _ = feed.clock.sleep(feed.window) => {
                    let held = feed.pending.lock().take();
                    if let Some(change) = held {
                        debug!(site = %feed.site, "flushing held changes");
                        feed.send(change);
                    }
                }
            }
        });
    }

    fn discard_pending(&self) {
        self.pending.lock().take();
        self.throttle.reset();
    }

    fn send(&self, change: ContentChanged) {
        // nobody listening is fine
        let _ = self.sender.send(change);
    }
}
