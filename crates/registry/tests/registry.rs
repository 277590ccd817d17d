use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dom_fixture::HtmlDocument;
use node_locator::{FallbackResolver, NodeRole, NodeRoleSpec};
use perceiver_site::EnvironmentProfile;
use site_adapters::{AdapterCore, AdapterState, InitSettings, SharedAdapter, SiteAdapter};
use sitelens_core_types::{
    DocumentHost, ErrorKind, ManualClock, SharedClock, SiteError, SiteId, SiteResult,
};
use sitelens_registry::{default_registry, install_default, AdapterRegistry, RegistryError};

#[derive(Default, Clone, Copy)]
struct Behaviour {
    fail_init: bool,
    fail_cleanup: bool,
    delay: Option<Duration>,
}

struct FakeAdapter {
    core: AdapterCore,
    behaviour: Behaviour,
    init_calls: AtomicUsize,
}

#[async_trait]
impl SiteAdapter for FakeAdapter {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    async fn initialize(&self) -> SiteResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.behaviour.delay {
            tokio::time::sleep(delay).await;
        }
        if self.behaviour.fail_init {
            return Err(SiteError::initialization_failed(self.site_id(), "boom"));
        }
        self.core.initialize().await
    }

    async fn cleanup(&self) -> SiteResult<()> {
        self.core.cleanup();
        if self.behaviour.fail_cleanup {
            return Err(SiteError::new(ErrorKind::Timeout, "cleanup stalled"));
        }
        Ok(())
    }
}

fn profile(id: &str) -> Arc<EnvironmentProfile> {
    let builder = NodeRole::all().into_iter().fold(
        EnvironmentProfile::builder(id).url_pattern(format!(r"^https://{id}\.example/")),
        |builder, role| builder.role(role, NodeRoleSpec::new(format!("#{role}"), role.name())),
    );
    Arc::new(builder.build().unwrap())
}

struct Fixture {
    doc: Arc<HtmlDocument>,
    clock: SharedClock,
    registry: AdapterRegistry,
}

impl Fixture {
    fn new() -> Self {
        let doc = HtmlDocument::shared("https://alpha.example/", "<body></body>");
        let clock: SharedClock = ManualClock::shared();
        let host: Arc<dyn DocumentHost> = doc.clone();
        let registry = AdapterRegistry::new(host, clock.clone());
        Self {
            doc,
            clock,
            registry,
        }
    }

    fn adapter(&self, id: &str, behaviour: Behaviour) -> Arc<FakeAdapter> {
        let core = AdapterCore::new(
            profile(id),
            self.doc.clone(),
            Arc::new(FallbackResolver::new(self.clock.clone())),
            self.clock.clone(),
            InitSettings::default(),
        );
        Arc::new(FakeAdapter {
            core,
            behaviour,
            init_calls: AtomicUsize::new(0),
        })
    }
}

fn shared(adapter: &Arc<FakeAdapter>) -> SharedAdapter {
    adapter.clone()
}

#[test]
fn duplicate_registration_is_rejected() {
    let fx = Fixture::new();
    let first = fx.adapter("alpha", Behaviour::default());
    let second = fx.adapter("alpha", Behaviour::default());

    fx.registry.register(shared(&first)).unwrap();
    let err = fx.registry.register(shared(&second)).unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate(ref id) if id.as_str() == "alpha"));
    assert_eq!(fx.registry.len(), 1);
}

#[test]
fn register_or_update_replaces_silently() {
    let fx = Fixture::new();
    let first = fx.adapter("alpha", Behaviour::default());
    let second = fx.adapter("alpha", Behaviour::default());

    assert!(fx.registry.register_or_update(shared(&first)).is_none());
    let displaced = fx.registry.register_or_update(shared(&second)).unwrap();
    assert!(Arc::ptr_eq(&displaced, &shared(&first)));

    let stored = fx.registry.adapter(&SiteId::new("alpha")).unwrap();
    assert!(Arc::ptr_eq(&stored, &shared(&second)));
    assert_eq!(fx.registry.detector().profiles().len(), 1);
}

#[test]
fn get_adapter_selects_by_detection() {
    let fx = Fixture::new();
    fx.registry
        .register(shared(&fx.adapter("alpha", Behaviour::default())))
        .unwrap();
    fx.registry
        .register(shared(&fx.adapter("beta", Behaviour::default())))
        .unwrap();

    let found = fx.registry.get_adapter(None).unwrap().unwrap();
    assert_eq!(found.site_id().as_str(), "alpha");

    let beta = fx
        .registry
        .get_adapter(Some("https://beta.example/chat"))
        .unwrap()
        .unwrap();
    assert_eq!(beta.site_id().as_str(), "beta");

    assert!(fx
        .registry
        .get_adapter(Some("https://gamma.example/"))
        .unwrap()
        .is_none());
    assert_eq!(
        fx.registry.site_ids(),
        vec![SiteId::new("alpha"), SiteId::new("beta")]
    );
}

#[test]
fn matched_profile_without_adapter_is_a_configuration_error() {
    let fx = Fixture::new();
    fx.registry.declare_profile(profile("alpha"));

    let Err(err) = fx.registry.get_adapter(None) else {
        panic!("a declared profile without an adapter must not resolve");
    };
    assert_eq!(err.kind(), Some(ErrorKind::SiteNotDetected));
    let RegistryError::Site(site_err) = err else {
        panic!("expected a site error");
    };
    let detection = site_err.context.detection.expect("detection attached");
    assert_eq!(detection.site, Some(SiteId::new("alpha")));
    assert!(detection.confidence > 0.5);
}

#[tokio::test]
async fn initialize_all_runs_each_adapter_once() {
    let fx = Fixture::new();
    let alpha = fx.adapter("alpha", Behaviour::default());
    let beta = fx.adapter("beta", Behaviour::default());
    fx.registry.register(shared(&alpha)).unwrap();
    fx.registry.register(shared(&beta)).unwrap();

    fx.registry.initialize_all().await.unwrap();
    fx.registry.initialize_all().await.unwrap();

    assert!(fx.registry.is_initialized());
    assert_eq!(alpha.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(beta.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(alpha.state(), AdapterState::Initialized);
}

#[tokio::test]
async fn partial_initialization_is_kept() {
    let fx = Fixture::new();
    let good = fx.adapter("alpha", Behaviour::default());
    let bad = fx.adapter(
        "beta",
        Behaviour {
            fail_init: true,
            ..Default::default()
        },
    );
    fx.registry.register(shared(&good)).unwrap();
    fx.registry.register(shared(&bad)).unwrap();

    let err = fx.registry.initialize_all().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InitializationFailed));
    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].0.as_str(), "beta");
    assert_eq!(good.state(), AdapterState::Initialized);
    assert!(!fx.registry.is_initialized());

    // only the failed adapter is retried
    assert!(fx.registry.initialize_all().await.is_err());
    assert_eq!(good.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bad.init_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn initialize_all_starts_adapters_together() {
    let fx = Fixture::new();
    let slow = Behaviour {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    fx.registry
        .register(shared(&fx.adapter("alpha", slow)))
        .unwrap();
    fx.registry
        .register(shared(&fx.adapter("beta", slow)))
        .unwrap();

    let started = tokio::time::Instant::now();
    fx.registry.initialize_all().await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_millis(100));
}

#[tokio::test]
async fn cleanup_is_best_effort() {
    let fx = Fixture::new();
    let stubborn = fx.adapter(
        "alpha",
        Behaviour {
            fail_cleanup: true,
            ..Default::default()
        },
    );
    let tidy = fx.adapter("beta", Behaviour::default());
    fx.registry.register(shared(&stubborn)).unwrap();
    fx.registry.register(shared(&tidy)).unwrap();
    fx.registry.initialize_all().await.unwrap();

    let err = fx.registry.cleanup_all().await.unwrap_err();
    assert!(matches!(err, RegistryError::Cleanup { ref failures } if failures.len() == 1));
    assert_eq!(tidy.state(), AdapterState::CleanedUp);
    assert_eq!(stubborn.state(), AdapterState::CleanedUp);
    assert_eq!(fx.registry.len(), 2);
    assert!(!fx.registry.is_initialized());
    assert_eq!(fx.doc.listener_count(), 0);
}

#[tokio::test]
async fn unregister_removes_adapter_and_profile() {
    let fx = Fixture::new();
    let alpha = fx.adapter("alpha", Behaviour::default());
    fx.registry.register(shared(&alpha)).unwrap();
    fx.registry.initialize_all().await.unwrap();

    assert!(fx.registry.unregister(&SiteId::new("alpha")).await.unwrap());
    assert_eq!(alpha.state(), AdapterState::CleanedUp);
    assert!(fx.registry.get_adapter(None).unwrap().is_none());
    assert!(!fx.registry.unregister(&SiteId::new("alpha")).await.unwrap());
}

#[tokio::test]
async fn unregister_keeps_declared_profiles() {
    let fx = Fixture::new();
    fx.registry.declare_profile(profile("alpha"));

    assert!(!fx.registry.unregister(&SiteId::new("alpha")).await.unwrap());
    assert_eq!(fx.registry.detector().profiles().len(), 1);
    let detection = fx.registry.detect_site(None);
    assert_eq!(detection.site, Some(SiteId::new("alpha")));
}

#[tokio::test]
async fn clear_empties_the_registry() {
    let fx = Fixture::new();
    let alpha = fx.adapter(
        "alpha",
        Behaviour {
            fail_cleanup: true,
            ..Default::default()
        },
    );
    let beta = fx.adapter("beta", Behaviour::default());
    fx.registry.register(shared(&alpha)).unwrap();
    fx.registry.register(shared(&beta)).unwrap();
    fx.registry.declare_profile(profile("gamma"));

    assert!(fx.registry.clear().await.is_err());
    assert!(fx.registry.is_empty());
    assert!(fx.registry.detector().profiles().is_empty());
    assert_eq!(beta.state(), AdapterState::CleanedUp);
}

#[test]
fn default_registry_installs_once() {
    let fx = Fixture::new();
    let registry = Arc::new(fx.registry);
    assert!(install_default(Arc::clone(&registry)).is_ok());
    assert!(install_default(Arc::clone(&registry)).is_err());
    let installed = default_registry().unwrap();
    assert!(Arc::ptr_eq(&installed, &registry));
}
