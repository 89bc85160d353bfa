use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "new",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One staged file change.
///
/// `content` holds the patch for modified and renamed files, the full staged
/// body for added files and nothing for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub path: String,
    pub kind: ChangeKind,
    pub content: String,
    pub old_path: Option<String>,
}

impl ChangeEntry {
    pub fn added(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Added, content)
    }

    pub fn modified(path: impl Into<String>, diff: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Modified, diff)
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Deleted, String::new())
    }

    pub fn renamed(
        old_path: impl Into<String>,
        path: impl Into<String>,
        diff: impl Into<String>,
    ) -> Self {
        Self {
            old_path: Some(old_path.into()),
            ..Self::new(path, ChangeKind::Renamed, diff)
        }
    }

    fn new(path: impl Into<String>, kind: ChangeKind, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            content: content.into(),
            old_path: None,
        }
    }
}

/// Staged changes in collection order. Paths are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
    paths: HashSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry` unless its path is already present. Returns whether it was added.
    pub fn insert(&mut self, entry: ChangeEntry) -> bool {
        if !self.paths.insert(entry.path.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEntry> {
        self.entries.iter()
    }
}

impl FromIterator<ChangeEntry> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ChangeEntry>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeEntry;
    type IntoIter = std::slice::Iter<'a, ChangeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
