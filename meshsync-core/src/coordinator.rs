use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::consensus::{Consensus, Transition};
use crate::pending::{ChangeEvent, PendingEntry, RelativePath};

/// Public contract over the replicated pending map (§4.B). Every operation
/// is safe to call from both the watcher and the sync worker.
#[derive(Clone)]
pub struct Coordinator {
    consensus: Arc<dyn Consensus>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("local_id", &self.consensus.local_id())
            .finish()
    }
}

impl Coordinator {
    pub fn new(consensus: Arc<dyn Consensus>) -> Self {
        Self { consensus }
    }

    pub fn local_id(&self) -> &str {
        self.consensus.local_id()
    }

    /// Snapshot of every entry this node has not yet acquired.
    pub fn get_files_to_sync(&self) -> HashMap<RelativePath, PendingEntry> {
        self.consensus.snapshot().files_to_sync(self.consensus.local_id())
    }

    /// Attempts to record a new change, per the four-step protocol in §4.B.
    /// Returns silently (not an error) whenever another node is legitimately
    /// claiming the path — last-writer policy resolves the race.
    pub async fn try_announce_update(&self, path: RelativePath, event: ChangeEvent) {
        let announce_lock_name = format!("announce:{path}");
        let Some(announce_guard) = self.consensus.try_lock(&announce_lock_name).await else {
            debug!(%path, "announce lock unavailable, backing off");
            return;
        };

        let snapshot = self.consensus.snapshot();
        if !snapshot.is_originator_of_record(&path, self.consensus.local_id()) {
            debug!(%path, "not originator of record, backing off");
            drop(announce_guard);
            return;
        }

        let cleanup_lock_name = format!("cleanup:{path}");
        let cleanup_guard = self.consensus.acquire_lock(&cleanup_lock_name).await;

        if let Err(err) = self
            .consensus
            .submit(Transition::AnnounceUpdate {
                path: path.clone(),
                source: self.consensus.local_id().to_string(),
                event,
            })
            .await
        {
            warn!(%path, %err, "announce_update submit failed, will retry on next trigger");
        } else {
            debug!(%path, ?event, "announced update");
        }

        drop(cleanup_guard);
        drop(announce_guard);
    }

    /// Submits a replicated acquisition acknowledgement. No lock required —
    /// the append-unique operation commutes across replicas.
    pub async fn announce_acquisition(&self, path: RelativePath) {
        if let Err(err) = self
            .consensus
            .submit(Transition::AnnounceAcquisition {
                path: path.clone(),
                node: self.consensus.local_id().to_string(),
            })
            .await
        {
            warn!(%path, %err, "announce_acquisition submit failed");
        } else {
            debug!(%path, "acknowledged acquisition");
        }
    }

    /// Leader-only periodic sweep: removes entries every cluster member has
    /// acquired. A no-op on non-leaders.
    pub async fn cleanup(&self) {
        if !self.consensus.is_local_leader().await {
            return;
        }
        let snapshot = self.consensus.snapshot();
        for path in snapshot.fully_synced(self.consensus.cluster_size()) {
            let lock_name = format!("cleanup:{path}");
            let guard = self.consensus.acquire_lock(&lock_name).await;
            if let Err(err) = self
                .consensus
                .submit(Transition::CleanupEntry { path: path.clone() })
                .await
            {
                warn!(%path, %err, "cleanup submit failed, will retry next sweep");
            } else {
                debug!(%path, "cleaned up fully propagated entry");
            }
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_consensus::LoopbackConsensus;

    fn coordinator(id: &str, cluster_size: usize) -> Coordinator {
        Coordinator::new(Arc::new(LoopbackConsensus::new(id, cluster_size)))
    }

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn announce_then_sync_then_acquire_then_cleanup() {
        let coordinator = coordinator("n1", 2);

        coordinator
            .try_announce_update(path("f.txt"), ChangeEvent::Modified)
            .await;

        let to_sync = coordinator.get_files_to_sync();
        assert!(to_sync.contains_key(&path("f.txt")));

        coordinator.announce_acquisition(path("f.txt")).await;
        assert!(coordinator.get_files_to_sync().is_empty());

        coordinator.cleanup().await;
        let snapshot = coordinator.get_files_to_sync();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn reannounce_by_current_holder_is_allowed() {
        let coordinator = coordinator("n1", 3);
        coordinator
            .try_announce_update(path("f.txt"), ChangeEvent::Modified)
            .await;
        coordinator
            .try_announce_update(path("f.txt"), ChangeEvent::Modified)
            .await;
        let to_sync = coordinator.get_files_to_sync();
        assert_eq!(to_sync.get(&path("f.txt")).unwrap().synced_to().len(), 1);
    }

    #[tokio::test]
    async fn non_originator_cannot_supersede() {
        // n1 announces via the shared consensus handle; a stray
        // try_announce_update issued locally by n2 must not overwrite it.
        use crate::consensus::{Consensus, Transition};
        let consensus = Arc::new(LoopbackConsensus::new("n2", 3));
        consensus
            .submit(Transition::AnnounceUpdate {
                path: path("f.txt"),
                source: "n1".into(),
                event: ChangeEvent::Modified,
            })
            .await
            .unwrap();

        let coordinator_n2 = Coordinator::new(Arc::clone(&consensus) as Arc<dyn crate::consensus::Consensus>);
        coordinator_n2
            .try_announce_update(path("f.txt"), ChangeEvent::Modified)
            .await;

        let entry = consensus.snapshot().get(&path("f.txt")).unwrap().clone();
        assert_eq!(entry.synced_to(), &["n1".to_string()]);
    }
}
