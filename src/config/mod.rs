//! Configuration management for shopsync.
//!
//! This module handles loading and saving configuration from `~/.shopsync/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{ApiConfig, Config, LogFormat, LoggingConfig, SyncConfig};
