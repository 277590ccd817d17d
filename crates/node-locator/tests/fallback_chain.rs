use std::sync::Arc;
use std::time::Duration;

use dom_fixture::HtmlDocument;
use node_locator::{
    FallbackResolver, FnValidator, NodeResolver, NodeRoleSpec, ResolveOptions, SelectorUsed,
    TextEntry,
};
use sitelens_core_types::{DomNode, ErrorKind, ManualClock};

fn site_a_document() -> HtmlDocument {
    HtmlDocument::new(
        "https://a.example/chat",
        r#"<html><body>
            <form>
              <textarea class="in" data-rect="0,0,400,60"></textarea>
              <button type="submit">Send</button>
            </form>
        </body></html>"#,
    )
}

#[tokio::test]
async fn fallback_zero_wins_when_primary_is_absent() {
    let doc = site_a_document();
    let clock = ManualClock::shared();
    let spec = NodeRoleSpec::new("#box", "site A prompt input")
        .with_fallbacks(["textarea.in"])
        .with_validator(Arc::new(TextEntry));

    let result = FallbackResolver::new(clock.clone())
        .resolve(&doc, &spec)
        .await;

    assert!(result.is_valid);
    assert_eq!(result.selector_used, Some(SelectorUsed::Fallback(0)));
    let node = result.node.expect("textarea resolved");
    assert_eq!(node.tag_name(), "textarea");
    assert_eq!(node.attribute("class").as_deref(), Some("in"));
    assert!(result.error.is_none());
    // primary retried three times before moving on
    assert_eq!(result.attempts, 4);
    assert_eq!(result.elapsed, Duration::from_millis(300));
}

#[tokio::test]
async fn primary_failing_validation_reports_fallback_index() {
    let doc = HtmlDocument::new(
        "https://a.example/chat",
        r#"<body><textarea id="box" readonly></textarea><textarea class="in"></textarea></body>"#,
    );
    let clock = ManualClock::shared();
    let spec = NodeRoleSpec::new("#box", "prompt")
        .with_fallbacks(["textarea.in"])
        .with_validator(Arc::new(TextEntry));

    let result = FallbackResolver::new(clock).resolve(&doc, &spec).await;

    assert_eq!(result.selector_used, Some(SelectorUsed::Fallback(0)));
    assert_ne!(result.selector_used, Some(SelectorUsed::Primary));
}

#[tokio::test]
async fn exhausted_chain_reports_element_not_found_at_budget() {
    let doc = HtmlDocument::new("https://a.example/", "<body><p>empty</p></body>");
    let clock = ManualClock::shared();
    let spec = NodeRoleSpec::new("#one", "injection point")
        .with_fallbacks(["#two", "#three", "#four", "#five"]);
    let options = ResolveOptions::default()
        .with_max_timeout(Duration::from_millis(300))
        .with_base_delay(Duration::from_millis(150))
        .with_backoff(false);

    let result = FallbackResolver::new(clock.clone())
        .with_options(options)
        .resolve(&doc, &spec)
        .await;

    assert!(result.node.is_none());
    assert!(!result.is_valid);
    assert_eq!(result.elapsed, Duration::from_millis(300));
    let err = result.error.expect("typed error");
    assert_eq!(err.kind, ErrorKind::ElementNotFound);
    assert_eq!(err.context.description.as_deref(), Some("injection point"));
    assert_eq!(err.context.elapsed, Some(Duration::from_millis(300)));
    // budget ran out on the first expression; later expressions were skipped
    assert_eq!(err.context.selectors_tried, vec!["#one".to_string()]);
}

#[tokio::test]
async fn budget_caps_total_attempts() {
    let doc = HtmlDocument::new("https://a.example/", "<body></body>");
    let clock = ManualClock::shared();
    let spec = NodeRoleSpec::new("#a", "anything").with_fallbacks(["#b", "#c"]);
    let options = ResolveOptions::default()
        .with_max_timeout(Duration::from_millis(200))
        .with_base_delay(Duration::from_millis(100));

    let result = FallbackResolver::new(clock.clone())
        .with_options(options)
        .resolve(&doc, &spec)
        .await;

    assert!(result.attempts <= 3);
    assert!(clock.elapsed() <= Duration::from_millis(300));
    assert!(result.elapsed <= Duration::from_millis(200));
}

#[tokio::test]
async fn hidden_and_disabled_candidates_are_skipped() {
    let doc = HtmlDocument::new(
        "https://a.example/",
        r#"<body>
            <button id="hidden" hidden>Send</button>
            <button id="disabled" disabled>Send</button>
            <button id="live">Send</button>
        </body>"#,
    );
    let clock = ManualClock::shared();
    let spec = NodeRoleSpec::new("#hidden", "send button").with_fallbacks(["#disabled", "#live"]);

    let result = FallbackResolver::new(clock)
        .with_options(ResolveOptions::default().with_max_attempts(1))
        .resolve(&doc, &spec)
        .await;

    assert_eq!(result.selector_used, Some(SelectorUsed::Fallback(1)));
    assert_eq!(result.attempts, 3);
}

#[tokio::test]
async fn document_change_between_retries_is_picked_up() {
    let doc = Arc::new(HtmlDocument::new("https://a.example/", "<body></body>"));
    let clock = ManualClock::shared();
    let spec = NodeRoleSpec::new("#late", "late node").with_validator(Arc::new(FnValidator::new(
        "any",
        |_node: &dyn DomNode| true,
    )));
    let resolver = FallbackResolver::new(clock.clone());

    let first = resolver.resolve(doc.as_ref(), &spec).await;
    assert!(!first.is_found());

    doc.set_html(r#"<body><div id="late"></div></body>"#);
    let second = resolver.resolve(doc.as_ref(), &spec).await;
    assert!(second.is_found());
    assert_eq!(second.selector_used, Some(SelectorUsed::Primary));
}
