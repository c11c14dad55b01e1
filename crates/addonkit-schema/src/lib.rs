//! Shared types for addonkit: version ordering, addon names, the catalog
//! document and the desired-state document. Nothing in this crate touches the
//! network or the filesystem.

pub mod catalog;
pub mod desired;
pub mod name;
pub mod version;

// Re-exports
pub use catalog::{AddonInfo, Catalog, CatalogError, Rejection};
pub use desired::{DesiredEntry, DesiredState, Settings};
pub use name::{AddonName, NameError};
pub use version::{Version, VersionError, compare, is_compatible};
