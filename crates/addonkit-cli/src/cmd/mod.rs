//! Command modules - one file per CLI command

pub mod completions;
pub mod list;
pub mod refresh;
pub mod settings;
pub mod sync;
pub mod toggle;
