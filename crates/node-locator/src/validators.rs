//! Typed validators applied to candidate nodes after visibility/interactability checks.

use std::fmt;

use regex::Regex;
use sitelens_core_types::DomNode;

/// Node-match capability attached to a [`crate::NodeRoleSpec`].
pub trait NodeValidator: Send + Sync {
    fn validate(&self, node: &dyn DomNode) -> bool;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Accepts anything the user can type into.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEntry;

impl NodeValidator for TextEntry {
    fn validate(&self, node: &dyn DomNode) -> bool {
        if node.is_content_editable() || node.attribute("role").as_deref() == Some("textbox") {
            return true;
        }
        match node.tag_name() {
            "textarea" => !node.has_attribute("readonly"),
            "input" => {
                let kind = node
                    .attribute("type")
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                matches!(kind.as_str(), "" | "text" | "search") && !node.has_attribute("readonly")
            }
            _ => false,
        }
    }

    fn name(&self) -> &str {
        "text-entry"
    }
}

/// Accepts buttons and button-like controls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitControl;

impl NodeValidator for SubmitControl {
    fn validate(&self, node: &dyn DomNode) -> bool {
        match node.tag_name() {
            "button" => true,
            "input" => matches!(
                node.attribute("type").as_deref(),
                Some("submit") | Some("button")
            ),
            _ => node.attribute("role").as_deref() == Some("button"),
        }
    }

    fn name(&self) -> &str {
        "submit-control"
    }
}

/// Rejects nodes whose rendered area is below a threshold (collapsed placeholders).
#[derive(Debug, Clone, Copy)]
pub struct MinArea(pub f64);

impl NodeValidator for MinArea {
    fn validate(&self, node: &dyn DomNode) -> bool {
        node.bounding_rect().area() >= self.0
    }

    fn name(&self) -> &str {
        "min-area"
    }
}

/// Requires an attribute whose value matches a pattern.
#[derive(Debug, Clone)]
pub struct AttributeMatches {
    attribute: String,
    pattern: Regex,
}

impl AttributeMatches {
    pub fn new(attribute: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            attribute: attribute.into(),
            pattern: Regex::new(pattern)?,
        })
    }
}

impl NodeValidator for AttributeMatches {
    fn validate(&self, node: &dyn DomNode) -> bool {
        node.attribute(&self.attribute)
            .map(|value| self.pattern.is_match(&value))
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "attribute-matches"
    }
}

/// Adapts a closure.
pub struct FnValidator<F> {
    name: String,
    check: F,
}

impl<F> FnValidator<F>
where
    F: Fn(&dyn DomNode) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> NodeValidator for FnValidator<F>
where
    F: Fn(&dyn DomNode) -> bool + Send + Sync,
{
    fn validate(&self, node: &dyn DomNode) -> bool {
        (self.check)(node)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnValidator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("name", &self.name)
            .finish()
    }
}
