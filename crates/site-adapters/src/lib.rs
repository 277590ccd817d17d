//! Environment adapters.
//!
//! An adapter bundles one environment profile with the behaviour needed to work inside
//! it: resolving the four node roles, contributing detection evidence and bringing
//! itself up and down against the host document.

pub mod adapter;
pub mod configured;
pub mod lifecycle;
pub mod sites;

pub use adapter::{AdapterState, ContentChanged, SharedAdapter, SiteAdapter};
pub use configured::{
    ConfigError, ConfiguredAdapter, MarkerConfig, ProfileConfig, RoleConfig, RolesConfig,
};
pub use lifecycle::{AdapterCore, InitSettings};
pub use sites::{
    builtin_adapter, builtin_adapters, ChatGptAdapter, ClaudeAdapter, GeminiAdapter,
    BUILTIN_SITES,
};
