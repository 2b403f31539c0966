//! Provenance of displayed elements
//!
//! Every element shown by a viewer is registered under an identifier. Elements
//! that were loaded from a point cloud file carry a [`SourceFileRef`]; shapes,
//! widgets and other generated geometry carry none.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// File a displayed element was loaded from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFileRef {
    pub path: PathBuf,
    /// Lower-case format name used to pick a reader, e.g. `"pcd"`
    pub format_hint: String,
}

impl SourceFileRef {
    pub fn new(path: impl Into<PathBuf>, format_hint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format_hint: format_hint.into().to_lowercase(),
        }
    }

    /// Reference to a PCD file
    pub fn pcd(path: impl Into<PathBuf>) -> Self {
        Self::new(path, "pcd")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key under which two references count as the same file
    ///
    /// Existing files are canonicalized, so symlinks and `./` or `../`
    /// spellings collapse onto one key. Paths that cannot be resolved fall
    /// back to a lexical form with `.` components removed and `..` applied
    /// where a preceding component allows it.
    pub fn file_key(&self) -> PathBuf {
        std::fs::canonicalize(&self.path).unwrap_or_else(|_| lexical_normal_form(&self.path))
    }
}

fn lexical_normal_form(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(Component::CurDir);
    }
    out
}

/// A displayed element and, if it came from a file, where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub source: Option<SourceFileRef>,
}

impl SourceEntry {
    pub fn with_source(id: impl Into<String>, source: SourceFileRef) -> Self {
        Self {
            id: id.into(),
            source: Some(source),
        }
    }

    /// Element with no backing file
    pub fn display_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
        }
    }
}

/// Displayed elements in registration order
///
/// Several elements may share one source file, for instance when the same
/// file is loaded twice under different identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any entry with the same id in place
    pub fn insert(&mut self, entry: SourceEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn register_source(&mut self, id: impl Into<String>, source: SourceFileRef) {
        self.insert(SourceEntry::with_source(id, source));
    }

    pub fn register_display_only(&mut self, id: impl Into<String>) {
        self.insert(SourceEntry::display_only(id));
    }

    pub fn get(&self, id: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<SourceEntry> {
        let position = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(position))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a SourceRegistry {
    type Item = &'a SourceEntry;
    type IntoIter = std::slice::Iter<'a, SourceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<SourceEntry> for SourceRegistry {
    fn from_iter<I: IntoIterator<Item = SourceEntry>>(iter: I) -> Self {
        let mut registry = Self::new();
        for entry in iter {
            registry.insert(entry);
        }
        registry
    }
}
