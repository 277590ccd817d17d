//! Node location for volatile documents.
//!
//! This crate implements the lookup side of the engine:
//! - node query utilities (visibility, interactability, change-driven waits, throttling)
//! - typed validators for candidate nodes
//! - the fallback resolver: primary expression first, then fallbacks in declared order,
//!   each retried with bounded backoff, the whole call bounded by a timeout budget

pub mod query;
pub mod resolver;
pub mod types;
pub mod validators;

pub use query::*;
pub use resolver::*;
pub use types::*;
pub use validators::*;
