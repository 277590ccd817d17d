use std::sync::Arc;

use node_locator::{NodeResolver, NodeRole};
use perceiver_site::{ConfidenceBoost, EnvironmentProfile, MarkerCheck, ProfileError};
use sitelens_core_types::{DocumentHost, SharedClock};

use super::{present, role_spec};
use crate::adapter::SiteAdapter;
use crate::lifecycle::{AdapterCore, InitSettings};

pub const SITE_ID: &str = "chatgpt";

const PROMPT_EDITOR: &str = "#prompt-textarea";

pub fn profile() -> Result<EnvironmentProfile, ProfileError> {
    EnvironmentProfile::builder(SITE_ID)
        .display_name("ChatGPT")
        .vendor("OpenAI")
        .homepage("https://chatgpt.com/")
        .url_pattern(r"^https://(www\.)?chatgpt\.com/")
        .url_pattern(r"^https://chat\.openai\.com/")
        .role(
            NodeRole::Input,
            role_spec(
                NodeRole::Input,
                PROMPT_EDITOR,
                &[
                    "div.ProseMirror[contenteditable=\"true\"]",
                    "form textarea",
                ],
                "ChatGPT prompt editor",
            ),
        )
        .role(
            NodeRole::Submit,
            role_spec(
                NodeRole::Submit,
                "button[data-testid=\"send-button\"]",
                &[
                    "button[aria-label=\"Send prompt\"]",
                    "form button[type=\"submit\"]",
                ],
                "ChatGPT send button",
            ),
        )
        .role(
            NodeRole::Container,
            role_spec(
                NodeRole::Container,
                "main div[role=\"presentation\"]",
                &["main"],
                "ChatGPT conversation",
            ),
        )
        .role(
            NodeRole::InjectionPoint,
            role_spec(
                NodeRole::InjectionPoint,
                "#composer-background",
                &["form", "main"],
                "ChatGPT composer",
            ),
        )
        .marker(MarkerCheck::selector(PROMPT_EDITOR))
        .marker(MarkerCheck::attribute(
            "meta[property=\"og:site_name\"]",
            "content",
            "(?i)chatgpt",
        )?)
        .marker(MarkerCheck::text("ChatGPT"))
        .build()
}

/// Conversation turns and the send button only render inside the ChatGPT shell.
#[derive(Debug, Default)]
pub struct ChatGptBoost;

impl ConfidenceBoost for ChatGptBoost {
    fn boost(&self, host: &dyn DocumentHost) -> f64 {
        let mut boost = 0.0;
        if present(host, "[data-testid^=\"conversation-turn\"]") {
            boost += 0.1;
        }
        if present(host, "button[data-testid=\"send-button\"]") {
            boost += 0.1;
        }
        boost
    }
}

/// The editor marker is optional: a fresh session may render it late.
pub struct ChatGptAdapter {
    core: AdapterCore,
}

impl ChatGptAdapter {
    pub fn new(
        host: Arc<dyn DocumentHost>,
        resolver: Arc<dyn NodeResolver>,
        clock: SharedClock,
    ) -> Result<Self, ProfileError> {
        let settings = InitSettings::default().with_marker(PROMPT_EDITOR, false);
        Ok(Self {
            core: AdapterCore::new(Arc::new(profile()?), host, resolver, clock, settings),
        })
    }
}

impl SiteAdapter for ChatGptAdapter {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn confidence_boost(&self) -> Option<Arc<dyn ConfidenceBoost>> {
        Some(Arc::new(ChatGptBoost))
    }
}
