use std::collections::BTreeMap;
use std::path::PathBuf;

/// Parsed variables keyed by name.
pub type EnvMap = BTreeMap<String, String>;

/// A parsed `KEY=VALUE` entry from a `.env` file or input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub source: Option<PathBuf>,
    /// Line of the assignment; multi-line values report their opening line.
    pub line: u32,
}

/// Summary of the load operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_existing: usize,
    pub files_read: usize,
}

pub(crate) fn into_map(entries: Vec<Entry>) -> EnvMap {
    entries
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect()
}
