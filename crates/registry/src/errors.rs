use sitelens_core_types::{ErrorKind, SiteError, SiteId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("adapter `{0}` is already registered")]
    Duplicate(SiteId),
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error("{} adapter(s) failed to initialize: {}", failures.len(), summarize(failures))]
    Initialization { failures: Vec<(SiteId, SiteError)> },
    #[error("{} adapter(s) failed to clean up: {}", failures.len(), summarize(failures))]
    Cleanup { failures: Vec<(SiteId, SiteError)> },
}

impl RegistryError {
    /// Closest typed error kind, when there is one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RegistryError::Duplicate(_) | RegistryError::Cleanup { .. } => None,
            RegistryError::Site(err) => Some(err.kind),
            RegistryError::Initialization { .. } => Some(ErrorKind::InitializationFailed),
        }
    }

    /// Per-adapter failures carried by aggregate errors.
    pub fn failures(&self) -> &[(SiteId, SiteError)] {
        match self {
            RegistryError::Initialization { failures } | RegistryError::Cleanup { failures } => {
                failures
            }
            _ => &[],
        }
    }
}

fn summarize(failures: &[(SiteId, SiteError)]) -> String {
    failures
        .iter()
        .map(|(site, err)| format!("{site}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}
