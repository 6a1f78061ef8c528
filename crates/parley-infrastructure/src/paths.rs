//! Unified path management for parley files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/parley/            # Config directory
//! ├── config.toml              # Tunables (optional)
//! ├── secret.json              # API keys
//! └── logs/                    # Daily-rotated logs
//!     └── parley.log.YYYY-MM-DD
//!
//! ~/.local/share/parley/       # Data directory
//! └── data.json                # Q&A cache (durable store)
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct ParleyPaths;

impl ParleyPaths {
    const APP_NAME: &'static str = "parley";

    /// Platform config directory, e.g. `~/.config/parley/`.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Platform data directory, e.g. `~/.local/share/parley/`.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(Self::APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    pub fn log_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Default location of the Q&A store.
    pub fn store_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("data.json"))
    }
}
