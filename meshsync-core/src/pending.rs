use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// A path relative to the managed root: UTF-8, POSIX separators, never empty,
/// never containing a `..` component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(CoreError::InvalidPath("empty path".into()));
        }
        if raw.contains('\\') {
            return Err(CoreError::InvalidPath(raw));
        }
        if raw.split('/').any(|seg| seg == "..") {
            return Err(CoreError::InvalidPath(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of change a [`PendingEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Modified,
    Deleted,
}

/// One replicated in-flight change, per the state diagram in §4.B: PENDING
/// while `synced_to` is growing, ACKED once every cluster member has
/// acquired it, then removed by cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub event: ChangeEvent,
    synced_to: Vec<String>,
}

impl PendingEntry {
    fn new(originator: String, event: ChangeEvent) -> Self {
        Self {
            event,
            synced_to: vec![originator],
        }
    }

    pub fn synced_to(&self) -> &[String] {
        &self.synced_to
    }

    pub fn has_synced(&self, node_id: &str) -> bool {
        self.synced_to.iter().any(|id| id == node_id)
    }

    fn acknowledge(&mut self, node_id: &str) -> bool {
        if self.has_synced(node_id) {
            return false;
        }
        self.synced_to.push(node_id.to_string());
        true
    }
}

/// The sole piece of replicated state: `relative_path -> PendingEntry`.
///
/// All mutation goes through `apply_*` methods so invariants 1-5 of the data
/// model can never be violated by a caller holding a `&mut PendingMap`.
#[derive(Debug, Clone, Default)]
pub struct PendingMap {
    entries: HashMap<RelativePath, PendingEntry>,
}

impl PendingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &RelativePath) -> Option<&PendingEntry> {
        self.entries.get(path)
    }

    pub fn is_originator_of_record(&self, path: &RelativePath, node_id: &str) -> bool {
        match self.entries.get(path) {
            None => true,
            Some(entry) => entry.has_synced(node_id),
        }
    }

    /// Entries whose `synced_to` does not yet contain `node_id` — a snapshot
    /// copy, per the "snapshot semantics" contract of `get_files_to_sync`.
    pub fn files_to_sync(&self, node_id: &str) -> HashMap<RelativePath, PendingEntry> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.has_synced(node_id))
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect()
    }

    /// Applies `announce_update`: installs a fresh entry, superseding any
    /// prior entry for the same path (invariant 4).
    pub fn apply_announce_update(
        &mut self,
        path: RelativePath,
        originator: String,
        event: ChangeEvent,
    ) {
        self.entries.insert(path, PendingEntry::new(originator, event));
    }

    /// Applies `announce_acquisition`: appends `node_id` to `synced_to` if
    /// the entry exists and does not already list it. No-op otherwise.
    pub fn apply_announce_acquisition(&mut self, path: &RelativePath, node_id: &str) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.acknowledge(node_id);
        }
    }

    /// Applies `cleanup_entry`: removes the entry if present.
    pub fn apply_cleanup(&mut self, path: &RelativePath) {
        self.entries.remove(path);
    }

    /// Entries ready for cleanup: `|synced_to| == cluster_size`.
    pub fn fully_synced(&self, cluster_size: usize) -> Vec<RelativePath> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.synced_to.len() == cluster_size)
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
