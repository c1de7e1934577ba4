//! Command-line arguments and settings resolution

use crate::config::{find_tool_on_path, AppConfig};
use crate::search::parse_type_filters;
use crate::types::SearchQuery;
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "rgscout",
    version,
    about = "Find files with ripgrep and list validated, sorted results"
)]
pub struct Cli {
    /// Config file (default: config.json next to the executable)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Append log lines to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log debug details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search and print the sorted results (Ctrl-C stops and keeps partial results)
    Search {
        #[command(flatten)]
        query: QueryArgs,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write raw ripgrep output for a search into a file
    Export {
        #[command(flatten)]
        query: QueryArgs,

        /// Destination file (overwritten)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show the ripgrep version
    Version {
        /// ripgrep executable
        #[arg(long)]
        rg: Option<PathBuf>,
    },
    /// Show or change the stored ripgrep path and search directory
    Config {
        /// ripgrep executable to store
        #[arg(long)]
        rg: Option<PathBuf>,

        /// Search directory to store
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Text to look for inside files; omit to list files
    pub pattern: Option<String>,

    /// Directory to search (default: stored directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Treat the pattern as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// File type filter, `;`-separated globs such as "*.cpp;*.h"
    #[arg(short, long, default_value = "")]
    pub types: String,

    /// ripgrep executable (default: stored path, then PATH)
    #[arg(long)]
    pub rg: Option<PathBuf>,
}

impl QueryArgs {
    pub fn to_query(&self, root_directory: PathBuf) -> SearchQuery {
        SearchQuery::new(
            root_directory,
            self.pattern.clone().unwrap_or_default(),
            self.regex,
            parse_type_filters(&self.types),
        )
    }
}

/// Loaded config plus where it lives; persists changes made through the CLI.
pub struct Settings {
    pub config: AppConfig,
    pub path: PathBuf,
}

impl Settings {
    pub fn load(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(AppConfig::default_path);
        let config = AppConfig::load_or_default(&path);
        Self { config, path }
    }

    /// Pick the ripgrep executable: explicit option, stored path, then PATH.
    pub fn resolve_tool(&mut self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("ripgrep executable not found: {}", path.display());
            }
            if self.config.set_tool_path(path) {
                self.save();
            }
            return Ok(path.to_path_buf());
        }

        if let Some(path) = self.config.tool_path() {
            return Ok(path);
        }

        if let Some(path) = find_tool_on_path() {
            log::info!("Using ripgrep from PATH: {}", path.display());
            if self.config.set_tool_path(&path) {
                self.save();
            }
            return Ok(path);
        }

        bail!("ripgrep executable not configured; pass --rg <PATH>")
    }

    /// Pick the search directory: explicit option, then stored directory.
    pub fn resolve_directory(&mut self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            if !dir.is_dir() {
                bail!("search directory not found: {}", dir.display());
            }
            if self.config.set_search_directory(dir) {
                self.save();
            }
            return Ok(dir.to_path_buf());
        }

        match self.config.default_directory() {
            Some(dir) => Ok(dir),
            None => bail!("search directory not configured; pass --dir <DIR>"),
        }
    }

    pub fn save(&self) {
        if let Err(e) = self.config.save(&self.path) {
            log::warn!("Failed to save config: {}", e);
        }
    }
}
