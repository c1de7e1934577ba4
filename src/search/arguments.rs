//! Command-line construction for ripgrep invocations

use crate::types::{MatchMode, SearchQuery};
use std::ffi::{OsStr, OsString};

/// Globs excluded from every search, in the order they are passed to ripgrep.
pub const BUILTIN_EXCLUDES: [&str; 5] = [
    "System Volume Information/**",
    "$RECYCLE.BIN/**",
    "pagefile.sys",
    "hiberfil.sys",
    "swapfile.sys",
];

/// Split a `;`-separated type filter string (e.g. `*.cpp;*.h`) into globs.
pub fn parse_type_filters(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the ripgrep argument list for a query.
///
/// Order: mode flags, include globs, `--no-messages`, built-in exclude
/// globs, and the root directory last. Pattern syntax is not validated.
pub fn build_arguments(query: &SearchQuery) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    match query.match_mode {
        MatchMode::ListOnly => {
            args.push("--files".into());
        }
        MatchMode::FixedString => {
            args.push("-l".into());
            args.push("-F".into());
            args.push(query.pattern.clone().into());
        }
        MatchMode::Regex => {
            args.push("-l".into());
            args.push(query.pattern.clone().into());
        }
    }

    for filter in &query.type_filters {
        for pattern in parse_type_filters(filter) {
            args.push(format!("--glob={}", pattern).into());
        }
    }

    args.push("--no-messages".into());

    for exclude in BUILTIN_EXCLUDES {
        args.push(format!("--glob=!{}", exclude).into());
    }

    args.push(query.root_directory.clone().into_os_string());
    args
}

/// Render the executable and its arguments as a single display line.
pub fn render_command_line(executable: &OsStr, args: &[OsString]) -> String {
    let mut line = executable.to_string_lossy().into_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
