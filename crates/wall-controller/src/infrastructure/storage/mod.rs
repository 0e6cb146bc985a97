//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform-appropriate directory (or an explicit path), provides defaults
//! when the file does not exist yet, and writes changes back to disk.

pub mod config;
