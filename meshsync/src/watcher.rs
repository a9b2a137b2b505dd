use std::path::{Path, PathBuf};
use std::sync::Arc;

use meshsync_core::{ChangeEvent, Coordinator, RelativePath};
use notify::event::RemoveKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::working_set::WorkingSet;

/// Watches `managed_root` recursively and proposes filtered changes to the
/// coordinator. Keeps the underlying [`RecommendedWatcher`] alive for as
/// long as the returned value is held.
pub struct FsWatcher {
    _inner: RecommendedWatcher,
}

impl FsWatcher {
    /// Starts watching. The notify callback runs on notify's own background
    /// thread; matched events are handed to the async coordinator via the
    /// current Tokio runtime handle.
    pub fn start(
        managed_root: PathBuf,
        coordinator: Coordinator,
        working_set: Arc<WorkingSet>,
    ) -> notify::Result<Self> {
        let runtime = Handle::current();
        let root_for_callback = managed_root.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        error!(%err, "filesystem watcher error");
                        return;
                    }
                };

                for (path, change) in matched_changes(&event, &root_for_callback) {
                    if working_set.contains(&path) {
                        debug!(%path, "ignoring re-entrant event from sync worker");
                        continue;
                    }
                    let coordinator = coordinator.clone();
                    runtime.spawn(async move {
                        coordinator.try_announce_update(path, change).await;
                    });
                }
            },
            notify::Config::default(),
        )?;

        watcher.watch(&managed_root, RecursiveMode::Recursive)?;

        Ok(Self { _inner: watcher })
    }
}

/// Converts one notify event into zero or more `(relative_path, ChangeEvent)`
/// pairs, applying the §4.C filters: files only, `MODIFIED`/`DELETED` only,
/// and a stale-`MODIFIED`-before-`DELETED` existence check.
fn matched_changes(event: &Event, managed_root: &Path) -> Vec<(RelativePath, ChangeEvent)> {
    let change = match event.kind {
        EventKind::Modify(_) => ChangeEvent::Modified,
        // RemoveKind::Folder is reported separately from file removal (e.g.
        // via IN_ISDIR on the inotify backend) and must be excluded here —
        // by the time this callback fires the path is already unlinked, so
        // an after-the-fact `Path::is_dir()` check can never tell the two
        // apart.
        EventKind::Remove(RemoveKind::File | RemoveKind::Any) => ChangeEvent::Deleted,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|path| {
            if change == ChangeEvent::Modified {
                // The watcher reliably emits a spurious MODIFIED immediately
                // preceding a DELETED; an existence check drops it.
                if !path.is_file() {
                    return None;
                }
            }

            relative_to(managed_root, path).map(|relative| (relative, change))
        })
        .collect()
}

fn relative_to(root: &Path, path: &Path) -> Option<RelativePath> {
    let stripped = path.strip_prefix(root).ok()?;
    if stripped.as_os_str().is_empty() {
        return None;
    }
    let posix = stripped
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    match RelativePath::new(posix) {
        Ok(relative) => Some(relative),
        Err(err) => {
            warn!(%err, path = %path.display(), "watcher saw an unrepresentable path");
            None
        }
    }
}
