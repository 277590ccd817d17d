//! HTML-backed [`DocumentHost`] used by the CLI and the test suites.
//!
//! The markup is re-parsed on every query so that `set_html` behaves like the page
//! owner swapping the DOM underneath us. Layout is not computed: a node's geometry comes
//! from an optional `data-rect="x,y,w,h"` attribute (default 100x20), and visibility
//! follows the `hidden` attribute and inline `display`/`visibility`/`opacity` declarations,
//! inherited from ancestors for `display: none`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use scraper::{node::Element, ElementRef, Html, Selector};
use sitelens_core_types::{
    ComputedStyle, DocumentHost, DomNode, MutationEvent, MutationListener, NodeHandle,
    QueryError, ReadyState, Rect, Subscription,
};
use tracing::debug;

const DEFAULT_RECT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 100.0,
    height: 20.0,
};

struct DocumentState {
    url: String,
    html: String,
    ready: ReadyState,
}

type ListenerMap = Arc<Mutex<BTreeMap<u64, MutationListener>>>;

pub struct HtmlDocument {
    state: RwLock<DocumentState>,
    listeners: ListenerMap,
    next_listener: AtomicU64,
    queries: AtomicU64,
}

impl HtmlDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(DocumentState {
                url: url.into(),
                html: html.into(),
                ready: ReadyState::Complete,
            }),
            listeners: Arc::new(Mutex::new(BTreeMap::new())),
            next_listener: AtomicU64::new(1),
            queries: AtomicU64::new(0),
        }
    }

    pub fn shared(url: impl Into<String>, html: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(url, html))
    }

    /// Replace the whole document and notify every listener.
    pub fn set_html(&self, html: impl Into<String>) {
        self.state.write().html = html.into();
        self.notify(&MutationEvent {
            added_nodes: 1,
            removed_nodes: 1,
            attribute: None,
        });
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.write().url = url.into();
    }

    pub fn set_ready_state(&self, ready: ReadyState) {
        self.state.write().ready = ready;
    }

    pub fn notify(&self, event: &MutationEvent) {
        let listeners: Vec<MutationListener> = self.listeners.lock().values().cloned().collect();
        debug!(listeners = listeners.len(), "dispatching fixture mutation");
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl DocumentHost for HtmlDocument {
    fn query(&self, expression: &str) -> Result<Option<NodeHandle>, QueryError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let selector =
            Selector::parse(expression).map_err(|err| QueryError::InvalidExpression {
                expression: expression.to_string(),
                reason: format!("{err:?}"),
            })?;
        let state = self.state.read();
        let document = Html::parse_document(&state.html);
        let node = document
            .select(&selector)
            .next()
            .map(|element| Arc::new(FixtureNode::capture(element)) as NodeHandle);
        Ok(node)
    }

    fn current_url(&self) -> String {
        self.state.read().url.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.state.read().ready
    }

    fn subscribe(&self, _root: Option<&NodeHandle>, listener: MutationListener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, listener);
        let listeners = Arc::clone(&self.listeners);
        Subscription::new(id, move || {
            listeners.lock().remove(&id);
        })
    }
}

/// Owned snapshot of an element taken at query time.
#[derive(Clone, Debug)]
pub struct FixtureNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    rect: Rect,
    style: ComputedStyle,
}

impl FixtureNode {
    fn capture(element: ElementRef<'_>) -> Self {
        let value = element.value();
        let attributes = value
            .attrs()
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect();
        let mut style = parse_inline_style(value.attr("style"));
        let hidden_by_ancestor = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| hides(ancestor.value()));
        if value.attr("hidden").is_some() || hidden_by_ancestor {
            style.display = "none".to_string();
        }
        let rect = if style.display == "none" {
            Rect::default()
        } else {
            value
                .attr("data-rect")
                .and_then(parse_rect)
                .unwrap_or(DEFAULT_RECT)
        };
        Self {
            tag: value.name().to_ascii_lowercase(),
            attributes,
            text: element.text().collect::<Vec<_>>().join(""),
            rect,
            style,
        }
    }
}

impl DomNode for FixtureNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn text_content(&self) -> String {
        self.text.clone()
    }

    fn bounding_rect(&self) -> Rect {
        self.rect
    }

    fn computed_style(&self) -> ComputedStyle {
        self.style.clone()
    }
}

fn hides(element: &Element) -> bool {
    element.attr("hidden").is_some() || parse_inline_style(element.attr("style")).display == "none"
}

fn parse_inline_style(style: Option<&str>) -> ComputedStyle {
    let mut computed = ComputedStyle::default();
    let Some(style) = style else {
        return computed;
    };
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim().to_ascii_lowercase();
        match property.trim().to_ascii_lowercase().as_str() {
            "display" => computed.display = value,
            "visibility" => computed.visibility = value,
            "pointer-events" => computed.pointer_events = value,
            "opacity" => {
                if let Ok(opacity) = value.parse::<f64>() {
                    computed.opacity = opacity;
                }
            }
            _ => {}
        }
    }
    computed
}

fn parse_rect(raw: &str) -> Option<Rect> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [x, y, width, height] => Some(Rect::new(*x, *y, *width, *height)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const PAGE: &str = r#"
        <html><head><title>Fixture</title></head><body>
          <div id="wrap" style="display: none"><textarea class="in">hidden</textarea></div>
          <textarea class="in" data-rect="0,0,300,40">shown</textarea>
          <button id="go" disabled>Send</button>
        </body></html>
    "#;

    #[test]
    fn query_returns_first_match_snapshot() {
        let doc = HtmlDocument::new("https://a.example/", PAGE);
        let node = doc.query("#go").unwrap().expect("button present");
        assert_eq!(node.tag_name(), "button");
        assert!(node.has_attribute("disabled"));
        assert_eq!(node.text_content(), "Send");
        assert!(doc.query("#missing").unwrap().is_none());
        assert_eq!(doc.query_count(), 2);
    }

    #[test]
    fn ancestor_display_none_hides_descendants() {
        let doc = HtmlDocument::new("https://a.example/", PAGE);
        let hidden = doc.query("#wrap textarea").unwrap().unwrap();
        assert_eq!(hidden.computed_style().display, "none");
        assert!(hidden.bounding_rect().is_empty());

        let shown = doc.query("body > textarea.in").unwrap().unwrap();
        assert_eq!(shown.bounding_rect(), Rect::new(0.0, 0.0, 300.0, 40.0));
    }

    #[test]
    fn malformed_selector_is_reported() {
        let doc = HtmlDocument::new("https://a.example/", PAGE);
        let err = doc.query("div[[").unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression { .. }));
    }

    #[test]
    fn listeners_fire_until_unsubscribed() {
        let doc = HtmlDocument::new("https://a.example/", PAGE);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = doc.subscribe(
            None,
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        doc.set_html("<p>changed</p>");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        sub.unsubscribe();
        assert_eq!(doc.listener_count(), 0);
        doc.set_html("<p>again</p>");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inline_style_parsing() {
        let style = parse_inline_style(Some("opacity: 0; pointer-events:none ; color: red"));
        assert_eq!(style.opacity, 0.0);
        assert_eq!(style.pointer_events, "none");
        assert_eq!(style.display, "block");
        assert_eq!(parse_rect("1, 2, 3"), None);
    }
}
