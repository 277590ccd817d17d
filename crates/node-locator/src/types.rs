//! Core types for node resolution

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sitelens_core_types::{NodeHandle, SiteError};

use crate::validators::{NodeValidator, SubmitControl, TextEntry};

/// The four interaction points every environment adapter must locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Text-entry point
    Input,
    /// Submit control
    Submit,
    /// Conversation/content container
    Container,
    /// Where injected UI gets attached
    InjectionPoint,
}

impl NodeRole {
    pub fn name(&self) -> &'static str {
        match self {
            NodeRole::Input => "input",
            NodeRole::Submit => "submit",
            NodeRole::Container => "container",
            NodeRole::InjectionPoint => "injection_point",
        }
    }

    pub fn all() -> [NodeRole; 4] {
        [
            NodeRole::Input,
            NodeRole::Submit,
            NodeRole::Container,
            NodeRole::InjectionPoint,
        ]
    }

    /// Validator applied when a spec for this role does not bring its own.
    pub fn default_validator(&self) -> Option<Arc<dyn NodeValidator>> {
        match self {
            NodeRole::Input => Some(Arc::new(TextEntry)),
            NodeRole::Submit => Some(Arc::new(SubmitControl)),
            NodeRole::Container | NodeRole::InjectionPoint => None,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which expression of the fallback chain produced the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorUsed {
    Primary,
    /// Index into `NodeRoleSpec::fallbacks`
    Fallback(usize),
}

impl fmt::Display for SelectorUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorUsed::Primary => f.write_str("primary"),
            SelectorUsed::Fallback(index) => write!(f, "{index}"),
        }
    }
}

/// How to find one node role: a primary expression, ordered fallbacks and an
/// optional validator.
#[derive(Clone)]
pub struct NodeRoleSpec {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub validator: Option<Arc<dyn NodeValidator>>,
    pub description: String,
}

impl NodeRoleSpec {
    pub fn new(primary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: Vec::new(),
            validator: None,
            description: description.into(),
        }
    }

    pub fn with_fallbacks<I, S>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks = fallbacks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn NodeValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_optional_validator(mut self, validator: Option<Arc<dyn NodeValidator>>) -> Self {
        self.validator = validator;
        self
    }

    /// The full chain in evaluation order.
    pub fn expressions(&self) -> impl Iterator<Item = (SelectorUsed, &str)> {
        std::iter::once((SelectorUsed::Primary, self.primary.as_str())).chain(
            self.fallbacks
                .iter()
                .enumerate()
                .map(|(index, expr)| (SelectorUsed::Fallback(index), expr.as_str())),
        )
    }

    /// Number of expressions in the chain (primary included).
    pub fn chain_len(&self) -> usize {
        1 + self.fallbacks.len()
    }
}

impl fmt::Debug for NodeRoleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRoleSpec")
            .field("primary", &self.primary)
            .field("fallbacks", &self.fallbacks)
            .field(
                "validator",
                &self.validator.as_ref().map(|validator| validator.name()),
            )
            .field("description", &self.description)
            .finish()
    }
}

/// Retry and budget settings for one `resolve` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_timeout_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 1000,
            max_timeout_ms: 5000,
            exponential_backoff: true,
        }
    }
}

impl ResolveOptions {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_backoff(mut self, exponential: bool) -> Self {
        self.exponential_backoff = exponential;
        self
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }

    /// Delay after failed attempt `attempt` (1-based), before the per-attempt cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms;
        let raw = if self.exponential_backoff {
            let shift = attempt.saturating_sub(1).min(32);
            base.saturating_mul(1u64 << shift)
        } else {
            base
        };
        Duration::from_millis(raw.min(self.max_delay_ms))
    }
}

/// Outcome of one `resolve` call. Never cached: the document may change at any time.
#[derive(Debug, Clone)]
pub struct NodeResolution {
    pub node: Option<NodeHandle>,
    pub selector_used: Option<SelectorUsed>,
    /// Text of the expression that matched
    pub selector: Option<String>,
    pub elapsed: Duration,
    pub attempts: u32,
    pub is_valid: bool,
    pub error: Option<SiteError>,
}

impl NodeResolution {
    pub fn found(
        node: NodeHandle,
        selector_used: SelectorUsed,
        selector: impl Into<String>,
        elapsed: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            node: Some(node),
            selector_used: Some(selector_used),
            selector: Some(selector.into()),
            elapsed,
            attempts,
            is_valid: true,
            error: None,
        }
    }

    pub fn not_found(error: SiteError, elapsed: Duration, attempts: u32) -> Self {
        Self {
            node: None,
            selector_used: None,
            selector: None,
            elapsed,
            attempts,
            is_valid: false,
            error: Some(error),
        }
    }

    pub fn is_found(&self) -> bool {
        self.node.is_some()
    }
}
