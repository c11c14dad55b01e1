//! addonkit - addon reconciliation from the command line
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Keeps a directory of addon artifacts in line with a desired-state file
//! (`addons.json`) and a remote catalog, for one host application version.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.addonkit/
//! ├── addons/       # <name>-<version>.<ext> artifacts
//! └── addons.json   # desired state
//! ```

pub mod cmd;
pub mod context;
pub mod ui;

pub use addonkit_core::paths::*;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "addonkit")]
#[command(author, version, about = "addonkit - keep host addons in line with their catalog")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Version of the host application addons are checked against
    #[arg(long, global = true, env = "ADDONKIT_HOST_VERSION")]
    pub host_version: Option<String>,

    /// Catalog URL
    #[arg(long, global = true, env = "ADDONKIT_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Catalog URL tried when the primary one fails
    #[arg(long, global = true, env = "ADDONKIT_BACKUP_REGISTRY_URL")]
    pub backup_url: Option<String>,

    /// Artifact directory [default: ~/.addonkit/addons]
    #[arg(long, global = true, env = "ADDONKIT_DIR")]
    pub dir: Option<PathBuf>,

    /// Desired-state file [default: ~/.addonkit/addons.json]
    #[arg(long, global = true, env = "ADDONKIT_STATE")]
    pub state: Option<PathBuf>,

    /// Artifact file extension
    #[arg(long, global = true, env = "ADDONKIT_EXTENSION", default_value = "jar")]
    pub extension: String,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, global = true, env = "ADDONKIT_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one reconciliation pass
    Sync {
        /// Upgrade enabled addons to the newest compatible version
        #[arg(long, conflicts_with = "no_upgrade")]
        upgrade: bool,
        /// Keep current versions while they stay compatible
        #[arg(long)]
        no_upgrade: bool,
    },
    /// Fetch the catalog and record newly published addons
    Refresh,
    /// Enable addons
    Enable {
        /// Addon name(s)
        #[arg(required = true)]
        names: Vec<String>,
        /// Run a pass afterwards
        #[arg(long)]
        sync: bool,
    },
    /// Disable addons
    Disable {
        /// Addon name(s)
        #[arg(required = true)]
        names: Vec<String>,
        /// Run a pass afterwards
        #[arg(long)]
        sync: bool,
    },
    /// List addons with their state
    List {
        /// Do not fetch the catalog
        #[arg(long)]
        offline: bool,
    },
    /// Change stored settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommands {
    /// Upgrade enabled addons on every sync
    AutoUpgrade {
        value: Switch,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}
