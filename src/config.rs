//! Persistent settings: the ripgrep path and the last search directory.
//!
//! Stored as a small JSON object:
//! `{ "rg_exe_path": "...", "search_directories": ["..."] }`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rg_exe_path: String,
    /// The first entry is the default search directory
    #[serde(default)]
    pub search_directories: Vec<String>,
}

impl AppConfig {
    /// `config.json` next to the running executable.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config, falling back to defaults when it is absent or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Write the whole config, replacing the previous file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Stored ripgrep path, if it still points at a file.
    pub fn tool_path(&self) -> Option<PathBuf> {
        let path = PathBuf::from(&self.rg_exe_path);
        (!self.rg_exe_path.is_empty() && path.is_file()).then_some(path)
    }

    /// First stored search directory, if it still exists.
    pub fn default_directory(&self) -> Option<PathBuf> {
        let dir = PathBuf::from(self.search_directories.first()?);
        dir.is_dir().then_some(dir)
    }

    /// Returns true when the value changed.
    pub fn set_tool_path(&mut self, path: &Path) -> bool {
        let value = path.to_string_lossy().into_owned();
        if self.rg_exe_path == value {
            return false;
        }
        self.rg_exe_path = value;
        true
    }

    /// Make `dir` the only stored search directory. Returns true when the
    /// value changed.
    pub fn set_search_directory(&mut self, dir: &Path) -> bool {
        let value = dir.to_string_lossy().into_owned();
        if self.search_directories.len() == 1 && self.search_directories[0] == value {
            return false;
        }
        self.search_directories = vec![value];
        true
    }
}

/// Locate `rg` on `PATH`.
pub fn find_tool_on_path() -> Option<PathBuf> {
    match which::which("rg") {
        Ok(path) => Some(path),
        Err(e) => {
            log::debug!("rg not found on PATH: {}", e);
            None
        }
    }
}
