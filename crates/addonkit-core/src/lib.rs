//! Reconciliation engine for addonkit.
//!
//! Keeps a directory of addon artifacts in line with a desired-state file and
//! a remote catalog. See [`engine::Engine`] for the pass itself.

pub mod artifacts;
pub mod config;
pub mod engine;
pub mod fetch;
pub mod io;
pub mod paths;
pub mod reporter;
pub mod resolver;
pub mod store;

pub use artifacts::ArtifactStore;
pub use config::EngineConfig;
pub use engine::{AddonState, Engine, EngineError, PassOutcome, PassReport, classify};
pub use paths::*;
pub use reporter::{LogLevel, NullReporter, RecordingReporter, Reporter};
pub use store::{DesiredStateStore, JsonStateStore, update_state};

/// User Agent string for catalog and artifact requests
pub const USER_AGENT: &str = concat!("addonkit/", env!("CARGO_PKG_VERSION"));
