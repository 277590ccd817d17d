use std::sync::Arc;

use node_locator::{NodeResolver, NodeRole};
use perceiver_site::{ConfidenceBoost, EnvironmentProfile, MarkerCheck, ProfileError};
use sitelens_core_types::{DocumentHost, SharedClock};

use super::{present, role_spec};
use crate::adapter::SiteAdapter;
use crate::lifecycle::{AdapterCore, InitSettings};

pub const SITE_ID: &str = "gemini";

const RICH_TEXTAREA: &str = "rich-textarea";

pub fn profile() -> Result<EnvironmentProfile, ProfileError> {
    EnvironmentProfile::builder(SITE_ID)
        .display_name("Gemini")
        .vendor("Google")
        .homepage("https://gemini.google.com/")
        .url_pattern(r"^https://gemini\.google\.com/")
        .role(
            NodeRole::Input,
            role_spec(
                NodeRole::Input,
                "rich-textarea div.ql-editor[contenteditable=\"true\"]",
                &["div.ql-editor", "rich-textarea [contenteditable=\"true\"]"],
                "Gemini prompt editor",
            ),
        )
        .role(
            NodeRole::Submit,
            role_spec(
                NodeRole::Submit,
                "button.send-button",
                &["button[aria-label=\"Send message\"]"],
                "Gemini send button",
            ),
        )
        .role(
            NodeRole::Container,
            role_spec(
                NodeRole::Container,
                "chat-window",
                &["infinite-scroller", "main"],
                "Gemini conversation",
            ),
        )
        .role(
            NodeRole::InjectionPoint,
            role_spec(
                NodeRole::InjectionPoint,
                "input-container",
                &[RICH_TEXTAREA, "main"],
                "Gemini input area",
            ),
        )
        .marker(MarkerCheck::selector(RICH_TEXTAREA))
        .marker(MarkerCheck::selector("chat-app"))
        .marker(MarkerCheck::text("Gemini"))
        .build()
}

#[derive(Debug, Default)]
pub struct GeminiBoost;

impl ConfidenceBoost for GeminiBoost {
    fn boost(&self, host: &dyn DocumentHost) -> f64 {
        let mut boost = 0.0;
        if present(host, "model-response") {
            boost += 0.1;
        }
        if present(host, "side-navigation") || present(host, "bard-sidenav") {
            boost += 0.1;
        }
        boost
    }
}

/// Requires the `rich-textarea` custom element: without it there is no usable editor.
pub struct GeminiAdapter {
    core: AdapterCore,
}

impl GeminiAdapter {
    pub fn new(
        host: Arc<dyn DocumentHost>,
        resolver: Arc<dyn NodeResolver>,
        clock: SharedClock,
    ) -> Result<Self, ProfileError> {
        let settings = InitSettings::default().with_marker(RICH_TEXTAREA, true);
        Ok(Self {
            core: AdapterCore::new(Arc::new(profile()?), host, resolver, clock, settings),
        })
    }
}

impl SiteAdapter for GeminiAdapter {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn confidence_boost(&self) -> Option<Arc<dyn ConfidenceBoost>> {
        Some(Arc::new(GeminiBoost))
    }
}
