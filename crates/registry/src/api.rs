use async_trait::async_trait;
use site_adapters::SharedAdapter;
use sitelens_core_types::{DetectionResult, SiteId};

use crate::errors::RegistryError;

/// Surface handed to collaborators (UI injection, text monitoring).
#[async_trait]
pub trait SiteRegistry: Send + Sync {
    fn detect_site(&self, url: Option<&str>) -> DetectionResult;
    /// `Ok(None)` when nothing matched; an error when a profile matched without an adapter.
    fn get_adapter(&self, url: Option<&str>) -> Result<Option<SharedAdapter>, RegistryError>;
    fn site_ids(&self) -> Vec<SiteId>;
    async fn initialize_all(&self) -> Result<(), RegistryError>;
    async fn cleanup_all(&self) -> Result<(), RegistryError>;
}
