//! Adapters declared in configuration instead of code.

use std::sync::Arc;

use node_locator::{NodeResolver, NodeRole, NodeRoleSpec};
use perceiver_site::{EnvironmentProfile, MarkerCheck, ProfileError};
use serde::{Deserialize, Serialize};
use sitelens_core_types::{DocumentHost, SharedClock};
use thiserror::Error;

use crate::adapter::SiteAdapter;
use crate::lifecycle::{AdapterCore, InitSettings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerConfig {
    Selector { selector: String },
    Text { token: String },
    Attribute {
        selector: String,
        name: String,
        pattern: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesConfig {
    pub input: RoleConfig,
    pub submit: RoleConfig,
    pub container: RoleConfig,
    pub injection_point: RoleConfig,
}

impl RolesConfig {
    fn get(&self, role: NodeRole) -> &RoleConfig {
        match role {
            NodeRole::Input => &self.input,
            NodeRole::Submit => &self.submit,
            NodeRole::Container => &self.container,
            NodeRole::InjectionPoint => &self.injection_point,
        }
    }
}

/// Serialized form of an environment profile plus its initialization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub url_patterns: Vec<String>,
    pub roles: RolesConfig,
    #[serde(default)]
    pub markers: Vec<MarkerConfig>,
    #[serde(default)]
    pub init: InitSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile `{id}`: {source}")]
    Profile {
        id: String,
        #[source]
        source: ProfileError,
    },
    #[error("profile id must not be empty")]
    EmptyId,
}

impl ProfileConfig {
    pub fn to_profile(&self) -> Result<EnvironmentProfile, ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        let wrap = |source: ProfileError| ConfigError::Profile {
            id: self.id.clone(),
            source,
        };

        let mut builder = EnvironmentProfile::builder(self.id.as_str());
        if let Some(name) = &self.display_name {
            builder = builder.display_name(name.as_str());
        }
        if let Some(vendor) = &self.vendor {
            builder = builder.vendor(vendor.as_str());
        }
        if let Some(homepage) = &self.homepage {
            builder = builder.homepage(homepage.as_str());
        }
        for pattern in &self.url_patterns {
            builder = builder.url_pattern(pattern.as_str());
        }
        for role in NodeRole::all() {
            let config = self.roles.get(role);
            let description = config
                .description
                .clone()
                .unwrap_or_else(|| format!("{} {}", self.id, role));
            let spec = NodeRoleSpec::new(config.primary.as_str(), description)
                .with_fallbacks(config.fallbacks.iter().map(String::as_str))
                .with_optional_validator(role.default_validator());
            builder = builder.role(role, spec);
        }
        for marker in &self.markers {
            let check = match marker {
                MarkerConfig::Selector { selector } => MarkerCheck::selector(selector.as_str()),
                MarkerConfig::Text { token } => MarkerCheck::text(token.as_str()),
                MarkerConfig::Attribute {
                    selector,
                    name,
                    pattern,
                } => MarkerCheck::attribute(selector.as_str(), name.as_str(), pattern)
                    .map_err(wrap)?,
            };
            builder = builder.marker(check);
        }
        builder.build().map_err(wrap)
    }
}

/// Adapter whose profile comes from a [`ProfileConfig`].
pub struct ConfiguredAdapter {
    core: AdapterCore,
}

impl ConfiguredAdapter {
    pub fn from_config(
        config: &ProfileConfig,
        host: Arc<dyn DocumentHost>,
        resolver: Arc<dyn NodeResolver>,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        let profile = Arc::new(config.to_profile()?);
        Ok(Self {
            core: AdapterCore::new(profile, host, resolver, clock, config.init.clone()),
        })
    }
}

impl SiteAdapter for ConfiguredAdapter {
    fn core(&self) -> &AdapterCore {
        &self.core
    }
}
