//! Path resolution for shopsync configuration and data files.
//!
//! All shopsync data is stored in `~/.shopsync/` unless overridden:
//! - `config.yaml` - Main configuration file
//! - `shopsync.db` - SQLite store of syncable records

use std::path::PathBuf;

use crate::error::ShopSyncError;

/// Environment variable that overrides the data root.
pub const HOME_ENV: &str = "SHOPSYNC_HOME";

/// Paths to shopsync configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.shopsync/`
    pub root: PathBuf,
    /// Config file: `~/.shopsync/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.shopsync/shopsync.db`
    pub database: PathBuf,
}

impl Paths {
    /// Create paths based on `SHOPSYNC_HOME` or the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither location can be determined.
    pub fn new() -> Result<Self, ShopSyncError> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            if !root.is_empty() {
                return Ok(Self::with_root(PathBuf::from(root)));
            }
        }

        let home = std::env::var("HOME").map_err(|_| {
            ShopSyncError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".shopsync")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("shopsync.db"),
            root,
        }
    }

    /// Ensure the root directory exists, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), ShopSyncError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                ShopSyncError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }

        Ok(())
    }
}
