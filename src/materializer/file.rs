//! # Materialized File Format
//!
//! One `NAME=value` line per credential. The file is rewritten in full on
//! every cycle; readers racing a write may observe a partial file.

use std::path::Path;

/// Name to value mapping built during one refresh cycle
///
/// Insertion order is preserved and becomes the line order of the file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    entries: Vec<(String, String)>,
}

// Values never appear in Debug output.
impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Render the file contents
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}={value}\n"))
            .collect()
    }

    /// Replace the file at `path` with this record
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created or written.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.render()).await
    }
}

impl FromIterator<(String, String)> for CredentialRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse materialized file contents back into ordered pairs
///
/// Each line is split on its first `=`; blank lines and lines without `=` are
/// skipped.
pub fn parse_materialized(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}
