use std::sync::Arc;
use std::time::Duration;

use dom_fixture::HtmlDocument;
use node_locator::{NodeRole, NodeRoleSpec};
use perceiver_site::{
    ConfidenceBoost, EnvironmentProfile, MarkerCheck, SiteDetector, DEFAULT_DETECTION_TTL,
};
use sitelens_core_types::{DocumentHost, ManualClock, SiteId};

fn profile(id: &str, pattern: &str, markers: Vec<MarkerCheck>) -> Arc<EnvironmentProfile> {
    let builder = NodeRole::all().into_iter().fold(
        EnvironmentProfile::builder(id).url_pattern(pattern),
        |builder, role| builder.role(role, NodeRoleSpec::new(format!("#{role}"), role.name())),
    );
    Arc::new(
        markers
            .into_iter()
            .fold(builder, |builder, marker| builder.marker(marker))
            .build()
            .expect("valid profile"),
    )
}

fn document(url: &str) -> Arc<HtmlDocument> {
    HtmlDocument::shared(
        url,
        r#"<html><head><title>Alpha</title></head>
           <body><div id="app" data-build="alpha-42"></div></body></html>"#,
    )
}

struct FixedBoost(f64);

impl ConfidenceBoost for FixedBoost {
    fn boost(&self, _host: &dyn DocumentHost) -> f64 {
        self.0
    }
}

#[test]
fn url_match_alone_yields_at_least_point_seven() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(profile("siteA", r"^https://a\.example/", vec![]), None);
    detector.register_profile(profile("siteB", r"^https://b\.example/", vec![]), None);

    let result = detector.detect(Some("https://a.example/chat"));
    assert_eq!(result.site, Some(SiteId::new("siteA")));
    assert!(result.confidence >= 0.7);
    assert!(!result.from_cache);
}

#[test]
fn unmatched_url_reports_zero_confidence() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    // markers would all succeed against this document; they must not count without a url match
    detector.register_profile(
        profile("siteA", r"^https://a\.example/", vec![MarkerCheck::selector("#app")]),
        Some(Arc::new(FixedBoost(0.2))),
    );

    let result = detector.detect(Some("https://elsewhere.example/"));
    assert_eq!(result.site, None);
    assert_eq!(result.confidence, 0.0);
    assert!(!result.is_match());
}

#[test]
fn malformed_url_never_throws() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(profile("siteA", r"a\.example", vec![]), None);

    let result = detector.detect(Some("not a url at all a.example"));
    assert_eq!(result.site, None);
    assert_eq!(result.confidence, 0.0);
    assert!(detector.cache().is_empty());
}

#[test]
fn structural_markers_and_boost_add_up() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(
        profile(
            "siteA",
            r"^https://a\.example/",
            vec![
                MarkerCheck::selector("#app"),
                MarkerCheck::text("Alpha"),
                MarkerCheck::attribute("#app", "data-build", "^alpha-").unwrap(),
                MarkerCheck::selector("#missing"),
            ],
        ),
        Some(Arc::new(FixedBoost(0.5))),
    );

    let result = detector.detect(None);
    assert_eq!(result.site, Some(SiteId::new("siteA")));
    assert!((result.signals.structural_score - 0.225).abs() < 1e-9);
    // boost is clamped to 0.2
    assert!((result.signals.boost - 0.2).abs() < 1e-9);
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn throwing_marker_is_skipped() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(
        profile(
            "siteA",
            r"^https://a\.example/",
            vec![MarkerCheck::selector("[[bad"), MarkerCheck::selector("#app")],
        ),
        None,
    );

    let result = detector.detect(Some("https://a.example/chat"));
    assert_eq!(result.site, Some(SiteId::new("siteA")));
    assert!((result.signals.structural_score - 0.15).abs() < 1e-9);
}

#[test]
fn ties_go_to_the_first_declared_profile() {
    let doc = document("https://shared.example/");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(profile("first", r"shared\.example", vec![]), None);
    detector.register_profile(profile("second", r"shared\.example", vec![]), None);

    let result = detector.detect(Some("https://shared.example/"));
    assert_eq!(result.site, Some(SiteId::new("first")));

    // the stronger structural signal wins over declaration order
    detector.register_profile(
        profile("second", r"shared\.example", vec![MarkerCheck::selector("#app")]),
        None,
    );
    let result = detector.detect(Some("https://shared.example/"));
    assert_eq!(result.site, Some(SiteId::new("second")));
}

#[test]
fn repeat_detection_within_ttl_comes_from_cache() {
    let doc = document("https://a.example/chat");
    let clock = ManualClock::shared();
    let detector = SiteDetector::new(doc, clock.clone());
    detector.register_profile(profile("siteA", r"^https://a\.example/", vec![]), None);

    let first = detector.detect(Some("https://a.example/chat"));
    clock.advance(Duration::from_secs(10));
    let second = detector.detect(Some("https://a.example/chat"));

    assert_eq!(first.site, second.site);
    assert_eq!(first.confidence, second.confidence);
    assert!(!first.from_cache);
    assert!(second.from_cache);

    clock.advance(DEFAULT_DETECTION_TTL);
    let third = detector.detect(Some("https://a.example/chat"));
    assert!(!third.from_cache);
}

#[test]
fn no_match_results_are_not_cached() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(profile("siteA", r"^https://a\.example/", vec![]), None);

    detector.detect(Some("https://other.example/"));
    assert!(detector.cache().is_empty());
    let again = detector.detect(Some("https://other.example/"));
    assert!(!again.from_cache);
}

#[test]
fn profile_changes_invalidate_the_cache() {
    let doc = document("https://a.example/chat");
    let detector = SiteDetector::new(doc, ManualClock::shared());
    detector.register_profile(profile("siteA", r"^https://a\.example/", vec![]), None);
    detector.detect(Some("https://a.example/chat"));
    assert_eq!(detector.cache().len(), 1);

    assert!(detector.remove_profile(&SiteId::new("siteA")));
    assert!(detector.cache().is_empty());
    let result = detector.detect(Some("https://a.example/chat"));
    assert_eq!(result.site, None);
}
