use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::context::CliContext;
use super::detect::cmd_detect;
use super::env::CliArgs;
use super::info::cmd_info;
use super::profiles::cmd_profiles;
use super::resolve::cmd_resolve;
use super::runtime::{init_logging, load_config, LoadedConfig};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let LoadedConfig {
        config,
        path,
        found,
    } = load_config(cli.config.as_ref()).await?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, cli.debug, config.logging.json)?;

    info!("Starting SiteLens v{}", crate::VERSION);
    if found {
        info!("Loaded configuration from: {}", path.display());
    } else {
        info!("Config file not found, using defaults: {}", path.display());
    }

    let ctx = CliContext::new(config, path, found, cli.output);
    let result = match cli.command {
        Commands::Detect(args) => cmd_detect(args, &ctx).await,
        Commands::Resolve(args) => cmd_resolve(args, &ctx).await,
        Commands::Profiles => cmd_profiles(&ctx).await,
        Commands::Info(args) => cmd_info(args, &ctx).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
