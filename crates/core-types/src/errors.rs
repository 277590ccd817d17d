//! Typed error model shared by every layer.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::detection::DetectionResult;
use crate::SiteId;

/// Closed set of error kinds surfaced to collaborators.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A profile matched with high confidence but no adapter is registered for it.
    SiteNotDetected,
    /// Resolution exhausted every expression or ran out of budget.
    ElementNotFound,
    /// A query expression could not be parsed by the host.
    SelectorInvalid,
    /// A wait exceeded its budget.
    Timeout,
    /// A node was found but rejected by its validator.
    ValidationFailed,
    /// Adapter setup could not complete.
    InitializationFailed,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::SiteNotDetected => "SITE_NOT_DETECTED",
            ErrorKind::ElementNotFound => "ELEMENT_NOT_FOUND",
            ErrorKind::SelectorInvalid => "SELECTOR_INVALID",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::InitializationFailed => "INITIALIZATION_FAILED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Structured diagnostics attached to a [`SiteError`].
#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    pub site: Option<SiteId>,
    pub description: Option<String>,
    pub selectors_tried: Vec<String>,
    pub elapsed: Option<Duration>,
    pub detection: Option<Box<DetectionResult>>,
}

#[derive(Debug, Error, Clone)]
#[error("{kind}: {message}")]
pub struct SiteError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

pub type SiteResult<T> = Result<T, SiteError>;

impl SiteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn site_not_detected(detection: DetectionResult) -> Self {
        let site = detection.site.clone();
        let message = format!(
            "profile '{}' matched {} with confidence {:.2} but no adapter is registered",
            site.as_ref().map(SiteId::as_str).unwrap_or("<none>"),
            detection.url,
            detection.confidence
        );
        let mut err = Self::new(ErrorKind::SiteNotDetected, message);
        err.context.site = site;
        err.context.detection = Some(Box::new(detection));
        err
    }

    pub fn element_not_found(
        description: impl Into<String>,
        selectors_tried: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        let description = description.into();
        let message = format!(
            "no accepted node for '{}' after trying {} expression(s) in {}ms",
            description,
            selectors_tried.len(),
            elapsed.as_millis()
        );
        Self::new(ErrorKind::ElementNotFound, message)
            .with_description(description)
            .with_selectors(selectors_tried)
            .with_elapsed(elapsed)
    }

    pub fn selector_invalid(selector: impl Into<String>, reason: impl fmt::Display) -> Self {
        let selector = selector.into();
        Self::new(
            ErrorKind::SelectorInvalid,
            format!("invalid query expression '{selector}': {reason}"),
        )
        .with_selectors(vec![selector])
    }

    pub fn timeout(operation: impl Into<String>, budget: Duration) -> Self {
        let operation = operation.into();
        Self::new(
            ErrorKind::Timeout,
            format!("{operation} exceeded its {}ms budget", budget.as_millis()),
        )
        .with_description(operation)
        .with_elapsed(budget)
    }

    pub fn validation_failed(selector: impl Into<String>, validator: &str) -> Self {
        let selector = selector.into();
        Self::new(
            ErrorKind::ValidationFailed,
            format!("node matched by '{selector}' rejected by validator '{validator}'"),
        )
        .with_selectors(vec![selector])
    }

    pub fn initialization_failed(site: &SiteId, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::InitializationFailed,
            format!("adapter '{}' failed to initialize: {}", site, reason.into()),
        )
        .with_site(site.clone())
    }

    pub fn with_site(mut self, site: SiteId) -> Self {
        self.context.site = Some(site);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.context.description = Some(description.into());
        self
    }

    pub fn with_selectors(mut self, selectors: Vec<String>) -> Self {
        self.context.selectors_tried = selectors;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.context.elapsed = Some(elapsed);
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether retrying the same operation against a changed document could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ElementNotFound | ErrorKind::Timeout | ErrorKind::ValidationFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::SiteNotDetected.code(), "SITE_NOT_DETECTED");
        assert_eq!(ErrorKind::ElementNotFound.to_string(), "ELEMENT_NOT_FOUND");
        assert_eq!(ErrorKind::InitializationFailed.code(), "INITIALIZATION_FAILED");
    }

    #[test]
    fn element_not_found_carries_context() {
        let err = SiteError::element_not_found(
            "prompt input",
            vec!["#a".into(), "#b".into()],
            Duration::from_millis(320),
        );
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
        assert_eq!(err.context.selectors_tried.len(), 2);
        assert_eq!(err.context.elapsed, Some(Duration::from_millis(320)));
        assert_eq!(err.context.description.as_deref(), Some("prompt input"));
        assert!(err.to_string().starts_with("ELEMENT_NOT_FOUND"));
        assert!(err.is_retryable());
    }

    #[test]
    fn site_not_detected_keeps_detection() {
        let mut detection = DetectionResult::no_match("https://a.example/");
        detection.site = Some(SiteId::new("siteA"));
        detection.confidence = 0.9;
        let err = SiteError::site_not_detected(detection);
        assert_eq!(err.kind, ErrorKind::SiteNotDetected);
        assert_eq!(err.context.site, Some(SiteId::new("siteA")));
        let detection = err.context.detection.expect("detection attached");
        assert_eq!(detection.confidence, 0.9);
        assert!(!err.kind.eq(&ErrorKind::Timeout));
    }
}
