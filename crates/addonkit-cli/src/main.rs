//! addonkit CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use addonkit_cli::cmd;
use addonkit_cli::{Cli, Commands, SettingsCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = &cli.global;

    match cli.command {
        Commands::Sync {
            upgrade,
            no_upgrade,
        } => {
            let upgrade = match (upgrade, no_upgrade) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd::sync::sync(global, upgrade).await
        }
        Commands::Refresh => cmd::refresh::refresh(global).await,
        Commands::Enable { names, sync } => cmd::toggle::toggle(global, &names, true, sync).await,
        Commands::Disable { names, sync } => {
            cmd::toggle::toggle(global, &names, false, sync).await
        }
        Commands::List { offline } => cmd::list::list(global, offline).await,
        Commands::Settings { command } => match command {
            SettingsCommands::AutoUpgrade { value } => {
                cmd::settings::auto_upgrade(global, value.is_on()).await
            }
        },
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
