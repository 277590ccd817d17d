use std::sync::Arc;

use node_locator::{NodeResolver, NodeRole};
use perceiver_site::{ConfidenceBoost, EnvironmentProfile, MarkerCheck, ProfileError};
use sitelens_core_types::{DocumentHost, SharedClock};

use super::{present, role_spec};
use crate::adapter::SiteAdapter;
use crate::lifecycle::{AdapterCore, InitSettings};

pub const SITE_ID: &str = "claude";

const EDITOR: &str = "div.ProseMirror[contenteditable=\"true\"]";

pub fn profile() -> Result<EnvironmentProfile, ProfileError> {
    EnvironmentProfile::builder(SITE_ID)
        .display_name("Claude")
        .vendor("Anthropic")
        .homepage("https://claude.ai/")
        .url_pattern(r"^https://claude\.ai/")
        .role(
            NodeRole::Input,
            role_spec(
                NodeRole::Input,
                EDITOR,
                &["fieldset [contenteditable=\"true\"]", "fieldset textarea"],
                "Claude message editor",
            ),
        )
        .role(
            NodeRole::Submit,
            role_spec(
                NodeRole::Submit,
                "button[aria-label=\"Send message\"]",
                &[
                    "button[aria-label=\"Send Message\"]",
                    "fieldset button[type=\"submit\"]",
                ],
                "Claude send button",
            ),
        )
        .role(
            NodeRole::Container,
            role_spec(
                NodeRole::Container,
                "div[data-testid=\"chat-messages\"]",
                &["main"],
                "Claude conversation",
            ),
        )
        .role(
            NodeRole::InjectionPoint,
            role_spec(
                NodeRole::InjectionPoint,
                "fieldset",
                &["form", "main"],
                "Claude composer",
            ),
        )
        .marker(MarkerCheck::selector("div.ProseMirror"))
        .marker(MarkerCheck::attribute(
            "meta[property=\"og:site_name\"]",
            "content",
            "(?i)claude",
        )?)
        .marker(MarkerCheck::text("Claude"))
        .build()
}

#[derive(Debug, Default)]
pub struct ClaudeBoost;

impl ConfidenceBoost for ClaudeBoost {
    fn boost(&self, host: &dyn DocumentHost) -> f64 {
        let mut boost = 0.0;
        if present(host, "[data-testid=\"user-message\"]") {
            boost += 0.1;
        }
        if present(host, ".font-claude-message") {
            boost += 0.1;
        }
        boost
    }
}

/// Proceeds without its editor marker; new conversations mount it lazily.
pub struct ClaudeAdapter {
    core: AdapterCore,
}

impl ClaudeAdapter {
    pub fn new(
        host: Arc<dyn DocumentHost>,
        resolver: Arc<dyn NodeResolver>,
        clock: SharedClock,
    ) -> Result<Self, ProfileError> {
        let settings = InitSettings::default().with_marker(EDITOR, false);
        Ok(Self {
            core: AdapterCore::new(Arc::new(profile()?), host, resolver, clock, settings),
        })
    }
}

impl SiteAdapter for ClaudeAdapter {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn confidence_boost(&self) -> Option<Arc<dyn ConfidenceBoost>> {
        Some(Arc::new(ClaudeBoost))
    }
}
