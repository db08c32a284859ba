//! Configuration for the stitch command
//!
//! Provides types and parsing for `stitch.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_cli_overrides, CliOverrides, ConfigError, CONFIG_FILE_NAME};
pub use schema::*;
