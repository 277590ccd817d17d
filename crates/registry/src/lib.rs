pub mod api;
pub mod default;
pub mod errors;
pub mod metrics;
pub mod state;

pub use api::SiteRegistry;
pub use default::{default_registry, install_default};
pub use errors::RegistryError;
pub use state::AdapterRegistry;
