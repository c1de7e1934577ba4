//! Streaming line parser for raw ripgrep output.
//!
//! Chunks arrive with arbitrary boundaries. Complete lines are trimmed,
//! stripped of permission-error noise, checked against the filesystem and
//! turned into [`ResultEntry`] values; incomplete tails are held until the
//! next chunk of the same stream.

use crate::core::OutputStream;
use crate::types::ResultEntry;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Access-denied messages as printed by ripgrep on Windows (localized and
/// errno forms) and on Unix. The English texts only count inside an `rg:`
/// error line, and the errno form only as the trailing `(os error N)`, so
/// result paths containing those words are kept.
const NOISE_SIGNATURE: &str =
    r"拒绝访问|\(os error (?:5|13)\)$|^rg: .*(?i:access is denied|permission denied)";

fn noise_signature() -> &'static Regex {
    static SIGNATURE: OnceLock<Regex> = OnceLock::new();
    SIGNATURE.get_or_init(|| Regex::new(NOISE_SIGNATURE).expect("noise signature is a valid regex"))
}

/// Returns true for benign permission-error lines that are not results.
pub fn is_noise_line(line: &str) -> bool {
    noise_signature().is_match(line)
}

/// Something the parser produced from one complete line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    Entry(ResultEntry),
    /// A line that looked like a path but does not exist
    MissingPath(String),
}

pub struct LineParser {
    pending: HashMap<OutputStream, Vec<u8>>,
    working_dir: PathBuf,
    noise_dropped: usize,
}

impl LineParser {
    /// Parser resolving relative lines against the current directory.
    pub fn new() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|e| {
            log::warn!("Cannot determine current directory: {}", e);
            PathBuf::new()
        });
        Self::with_working_dir(working_dir)
    }

    pub fn with_working_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            pending: HashMap::new(),
            working_dir: working_dir.into(),
            noise_dropped: 0,
        }
    }

    /// Number of noise lines dropped since construction.
    pub fn noise_dropped(&self) -> usize {
        self.noise_dropped
    }

    /// Consume one chunk and return the events for every line it completed.
    pub fn feed(&mut self, stream: OutputStream, chunk: &[u8]) -> Vec<ParseEvent> {
        let buffer = self.pending.entry(stream).or_default();
        buffer.extend_from_slice(chunk);

        let Some(last_newline) = buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let remainder = buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(buffer, remainder);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Drop whatever unterminated output is still pending.
    ///
    /// Returns the number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let mut discarded = 0;
        for (stream, fragment) in self.pending.drain() {
            if fragment.is_empty() {
                continue;
            }
            log::debug!(
                "Discarding unterminated {:?} line at end of output: {}",
                stream,
                String::from_utf8_lossy(&fragment)
            );
            discarded += fragment.len();
        }
        discarded
    }

    fn parse_line(&mut self, raw: &[u8]) -> Option<ParseEvent> {
        let decoded = String::from_utf8_lossy(raw);
        let line = decoded.trim();
        if line.is_empty() {
            return None;
        }

        if is_noise_line(line) {
            log::trace!("Dropping noise line: {}", line);
            self.noise_dropped += 1;
            return None;
        }

        let path = self.resolve(line);
        if !path.exists() {
            log::debug!("Path not found: {}", line);
            return Some(ParseEvent::MissingPath(line.to_string()));
        }

        match ResultEntry::from_path(&path) {
            Some(entry) => Some(ParseEvent::Entry(entry)),
            None => {
                log::debug!("Skipping path without file name: {}", line);
                None
            }
        }
    }

    fn resolve(&self, line: &str) -> PathBuf {
        let path = Path::new(line);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        };
        // Drops interior `.` components such as the one in `/cwd/./file`
        absolute.components().collect()
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}
