use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use node_locator::NodeRole;

#[derive(Subcommand)]
pub enum Commands {
    /// Detect which known environment a saved page belongs to
    Detect(DetectArgs),
    /// Locate the interaction points of a saved page
    Resolve(ResolveArgs),
    /// List the registered environment profiles
    Profiles,
    /// Show build, configuration and telemetry details
    Info(InfoArgs),
}

/// A saved page and the location it was captured from.
#[derive(Args, Clone, Debug)]
pub struct PageArgs {
    /// URL the page was served from
    #[arg(long)]
    pub url: String,

    /// HTML snapshot of the page
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct DetectArgs {
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Only resolve this role
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,

    /// Run the adapter's initialize/cleanup cycle around resolution
    #[arg(long)]
    pub initialize: bool,
}

#[derive(Args, Clone, Debug)]
pub struct InfoArgs {
    /// Also print registry metrics in Prometheus text format
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Input,
    Submit,
    Container,
    Injection,
}

impl From<RoleArg> for NodeRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Input => NodeRole::Input,
            RoleArg::Submit => NodeRole::Submit,
            RoleArg::Container => NodeRole::Container,
            RoleArg::Injection => NodeRole::InjectionPoint,
        }
    }
}
