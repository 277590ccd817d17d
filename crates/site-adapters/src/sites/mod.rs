//! Built-in adapters for the supported chat environments.

use std::sync::Arc;

use node_locator::{NodeResolver, NodeRole, NodeRoleSpec};
use perceiver_site::ProfileError;
use sitelens_core_types::{DocumentHost, SharedClock};

use crate::adapter::SharedAdapter;

pub mod chatgpt;
pub mod claude;
pub mod gemini;

pub use chatgpt::ChatGptAdapter;
pub use claude::ClaudeAdapter;
pub use gemini::GeminiAdapter;

/// Ids of the adapters shipped with the crate, in declaration order.
pub const BUILTIN_SITES: [&str; 3] = [chatgpt::SITE_ID, claude::SITE_ID, gemini::SITE_ID];

/// Build one built-in adapter by id; `None` for an unknown id.
pub fn builtin_adapter(
    id: &str,
    host: Arc<dyn DocumentHost>,
    resolver: Arc<dyn NodeResolver>,
    clock: SharedClock,
) -> Option<Result<SharedAdapter, ProfileError>> {
    let adapter = match id {
        chatgpt::SITE_ID => {
            ChatGptAdapter::new(host, resolver, clock).map(|a| Arc::new(a) as SharedAdapter)
        }
        claude::SITE_ID => {
            ClaudeAdapter::new(host, resolver, clock).map(|a| Arc::new(a) as SharedAdapter)
        }
        gemini::SITE_ID => {
            GeminiAdapter::new(host, resolver, clock).map(|a| Arc::new(a) as SharedAdapter)
        }
        _ => return None,
    };
    Some(adapter)
}

/// Every built-in adapter, in declaration order.
pub fn builtin_adapters(
    host: Arc<dyn DocumentHost>,
    resolver: Arc<dyn NodeResolver>,
    clock: SharedClock,
) -> Result<Vec<SharedAdapter>, ProfileError> {
    BUILTIN_SITES
        .iter()
        .filter_map(|id| {
            builtin_adapter(
                id,
                Arc::clone(&host),
                Arc::clone(&resolver),
                Arc::clone(&clock),
            )
        })
        .collect()
}

/// Role spec with the role's default validator attached.
pub(crate) fn role_spec(
    role: NodeRole,
    primary: &str,
    fallbacks: &[&str],
    description: &str,
) -> NodeRoleSpec {
    NodeRoleSpec::new(primary, description)
        .with_fallbacks(fallbacks.iter().copied())
        .with_optional_validator(role.default_validator())
}

/// Malformed expressions count as absent.
pub(crate) fn present(host: &dyn DocumentHost, expression: &str) -> bool {
    matches!(host.query(expression), Ok(Some(_)))
}
