use std::collections::HashSet;
use std::sync::Arc;

use meshsync_core::RelativePath;
use parking_lot::RwLock;

/// The sync worker's view of "paths not yet pulled", published once per tick
/// and consulted by the watcher to suppress the re-entrant events its own
/// writes/deletes trigger (§4.D, §5, §9 "Re-entrant filesystem events").
///
/// Single-writer (the sync worker) / single-reader (the watcher) by
/// convention; the cell itself only needs atomic reference replacement, so
/// a `parking_lot::RwLock` around an `Arc` snapshot is enough — readers
/// never block a writer mid-publish.
#[derive(Debug, Default)]
pub struct WorkingSet {
    current: RwLock<Arc<HashSet<RelativePath>>>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(HashSet::new())),
        }
    }

    pub fn publish(&self, paths: HashSet<RelativePath>) {
        *self.current.write() = Arc::new(paths);
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.current.read().contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_replaces_and_reads_are_visible() {
        let working_set = WorkingSet::new();
        let path = RelativePath::new("f.txt").unwrap();
        assert!(!working_set.contains(&path));

        let mut set = HashSet::new();
        set.insert(path.clone());
        working_set.publish(set);
        assert!(working_set.contains(&path));

        working_set.publish(HashSet::new());
        assert!(!working_set.contains(&path));
    }
}
