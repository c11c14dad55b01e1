//! Terminal output for addonkit commands.
//!
//! - [`theme`] - Colors and icons
//! - [`output`] - `Reporter` implementation that prints to the terminal
//! - [`list`] - Addon table for `addonkit list`
//! - [`summary`] - End-of-pass summary

pub mod list;
pub mod output;
pub mod summary;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
