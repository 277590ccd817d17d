//! Shared primitives for the sitelens engine.
//!
//! Everything that more than one layer needs lives here: site identifiers, the typed
//! error model, detection results, the host document ports and the clock abstraction.

use std::fmt;

pub mod clock;
pub mod detection;
pub mod errors;
pub mod host;

pub use clock::{system_clock, Clock, ManualClock, SharedClock, TokioClock};
pub use detection::{clamp_confidence, DetectionResult, DetectionSignals, MATCH_THRESHOLD};
pub use errors::{ErrorContext, ErrorKind, SiteError, SiteResult};
pub use host::{
    ComputedStyle, DocumentHost, DomNode, MutationEvent, MutationListener, NodeHandle,
    QueryError, ReadyState, Rect, Subscription,
};

/// Identifier of an environment profile (and of the adapter serving it).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SiteId(pub String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SiteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
