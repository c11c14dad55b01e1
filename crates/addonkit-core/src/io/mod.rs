//! Side effects on the network and the filesystem.

pub mod download;
