//! Optional process-wide registry for callers that cannot thread a context object.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::state::AdapterRegistry;

static DEFAULT_REGISTRY: OnceCell<Arc<AdapterRegistry>> = OnceCell::new();

/// Install the default registry. Fails (handing the argument back) when one is installed.
pub fn install_default(registry: Arc<AdapterRegistry>) -> Result<(), Arc<AdapterRegistry>> {
    DEFAULT_REGISTRY.set(registry)
}

pub fn default_registry() -> Option<Arc<AdapterRegistry>> {
    DEFAULT_REGISTRY.get().cloned()
}
