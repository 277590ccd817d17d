//! SiteLens library
//!
//! Wires the detection and resolution crates into an application context and exposes
//! the command-line front end for integration testing.

pub mod app_context;
pub mod cli;
pub mod config;

pub use app_context::AppContext;
pub use config::Config;

/// Version string with build metadata.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    " ",
    env!("BUILD_DATE"),
    ")"
);
