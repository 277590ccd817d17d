pub mod app;
pub mod commands;
pub mod context;
pub mod detect;
pub mod env;
pub mod info;
pub mod output;
pub mod profiles;
pub mod resolve;
pub mod runtime;

pub use app::run;
pub use output::OutputFormat;
