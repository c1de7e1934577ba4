//! Ordered collection of result entries.

use crate::types::ResultEntry;

/// Result entries kept sorted by name.
///
/// The whole set is re-sorted after every batch so a partially finished
/// search always shows ordered results. Sorting is stable and compares
/// names byte-wise; duplicate entries are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: Vec<ResultEntry>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn append(&mut self, batch: impl IntoIterator<Item = ResultEntry>) {
        self.entries.extend(batch);
        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }
}
