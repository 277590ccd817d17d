//! Ports the host document environment must provide.
//!
//! The engine never owns the document. It only sees it through [`DocumentHost`]
//! (query, location, readiness, change subscriptions) and [`DomNode`] handles.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Subset of the computed style the engine inspects.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub pointer_events: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            pointer_events: "auto".to_string(),
        }
    }
}

/// Opaque view of one element in the external document.
pub trait DomNode: Send + Sync + fmt::Debug {
    /// Lower-case tag name.
    fn tag_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<String>;
    fn text_content(&self) -> String;
    fn bounding_rect(&self) -> Rect;
    fn computed_style(&self) -> ComputedStyle;

    fn is_connected(&self) -> bool {
        true
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn is_content_editable(&self) -> bool {
        matches!(
            self.attribute("contenteditable").as_deref(),
            Some("") | Some("true") | Some("plaintext-only")
        )
    }
}

pub type NodeHandle = Arc<dyn DomNode>;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Summary of one batch of structural changes reported by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationEvent {
    pub added_nodes: usize,
    pub removed_nodes: usize,
    pub attribute: Option<String>,
}

pub type MutationListener = Arc<dyn Fn(&MutationEvent) + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid query expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
    #[error("host query failed: {0}")]
    Host(String),
}

/// Handle for an attached change listener. Detaches on `unsubscribe` or drop.
pub struct Subscription {
    id: u64,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(id: u64, detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            detach: Some(Box::new(detach)),
        }
    }

    /// A subscription that was never attached to anything.
    pub fn detached(id: u64) -> Self {
        Self { id, detach: None }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// The host document environment.
pub trait DocumentHost: Send + Sync {
    /// Return the first node matching `expression`, if any.
    fn query(&self, expression: &str) -> Result<Option<NodeHandle>, QueryError>;
    fn current_url(&self) -> String;
    fn ready_state(&self) -> ReadyState;
    /// Attach a structural-change listener to `root` (the whole document when `None`).
    fn subscribe(&self, root: Option<&NodeHandle>, listener: MutationListener) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscription_detaches_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = Subscription::new(7, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(sub.is_active());
        assert_eq!(sub.id(), 7);
        sub.unsubscribe();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_detaches_on_drop() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        {
            let _sub = Subscription::new(1, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rect_emptiness() {
        assert!(Rect::default().is_empty());
        assert!(!Rect::new(0.0, 0.0, 10.0, 2.0).is_empty());
        assert_eq!(Rect::new(0.0, 0.0, 10.0, 2.0).area(), 20.0);
    }
}
