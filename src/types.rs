use serde::Serialize;
use std::path::{Path, PathBuf};

/// How the pattern of a [`SearchQuery`] is handed to ripgrep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// No pattern: list every file (`--files`)
    ListOnly,
    /// Literal string match (`-F`)
    FixedString,
    /// Pattern passed through as a regular expression
    Regex,
}

/// Parameters of one search or export invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub root_directory: PathBuf,
    pub pattern: String,
    pub match_mode: MatchMode,
    pub type_filters: Vec<String>,
}

impl SearchQuery {
    /// Build a query, deriving the match mode from the pattern.
    ///
    /// An empty pattern always yields [`MatchMode::ListOnly`]; otherwise
    /// `regex` selects between [`MatchMode::Regex`] and [`MatchMode::FixedString`].
    pub fn new(
        root_directory: impl Into<PathBuf>,
        pattern: impl Into<String>,
        regex: bool,
        type_filters: Vec<String>,
    ) -> Self {
        let pattern = pattern.into();
        let match_mode = if pattern.is_empty() {
            MatchMode::ListOnly
        } else if regex {
            MatchMode::Regex
        } else {
            MatchMode::FixedString
        };

        Self {
            root_directory: root_directory.into(),
            pattern,
            match_mode,
            type_filters,
        }
    }

    pub fn is_list_only(&self) -> bool {
        self.match_mode == MatchMode::ListOnly
    }
}

/// One validated search hit, split into file name and containing directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResultEntry {
    pub name: String,
    pub directory: String,
}

impl ResultEntry {
    pub fn new(name: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
        }
    }

    /// Decompose an absolute path into name and directory.
    ///
    /// Returns `None` for paths without a file name component (e.g. `/`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?;
        let directory = path.parent()?;
        Some(Self {
            name: name.to_string_lossy().into_owned(),
            directory: directory.to_string_lossy().into_owned(),
        })
    }

    pub fn full_path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.name)
    }
}
