//! User overrides for the join parent of individual commits.

pub mod store;

pub use store::{EditLocation, EditStore};

use crate::error::Result;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// Commit id -> index of the parent that continues the commit's branch.
///
/// Persisted as a flat `commit-hex-id = parent-index` table. Entries are
/// kept sorted by commit id so row ranges are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditList {
    entries: BTreeMap<String, usize>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted table. Lines that do not hold a hex id and an
    /// unsigned index are skipped.
    pub fn parse(text: &str) -> Self {
        let mut list = Self::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_entry(line) {
                Some((id, index)) => {
                    list.entries.insert(id, index);
                }
                None => debug!(line = number + 1, "skipping malformed edit entry"),
            }
        }

        list
    }

    /// Load from `path`; a missing or unreadable file yields an empty list
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "ignoring unreadable edit list");
                }
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|(id, index)| format!("{} = {}\n", id, index))
            .collect()
    }

    pub fn get_primary_parent_index(&self, commit_id: &str) -> Option<usize> {
        self.entries.get(&normalize(commit_id)).copied()
    }

    pub fn set(&mut self, commit_id: impl Into<String>, index: usize) {
        self.entries.insert(normalize(&commit_id.into()), index);
    }

    pub fn remove(&mut self, commit_id: &str) -> Option<usize> {
        self.entries.remove(&normalize(commit_id))
    }

    /// Remove the entries at `range` positions in id order; returns how
    /// many were removed
    pub fn remove_range(&mut self, range: Range<usize>) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .skip(range.start)
            .take(range.end.saturating_sub(range.start))
            .cloned()
            .collect();

        for id in &doomed {
            self.entries.remove(id);
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(id, &index)| (id.as_str(), index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(line: &str) -> Option<(String, usize)> {
    let (id, index) = line.split_once('=')?;
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let index = index.trim().parse::<usize>().ok()?;
    Some((normalize(id), index))
}

/// Commit ids are compared case-insensitively
fn normalize(commit_id: &str) -> String {
    commit_id.to_ascii_lowercase()
}
