use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use meshsync_config::ClusterTopology;
use meshsync_core::{ChangeEvent, Coordinator, PendingEntry, RelativePath};
use rand::seq::IndexedRandom;
use tracing::{debug, error, info, warn};

use crate::working_set::WorkingSet;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Runs the §4.D tick loop until the process is torn down. A failure within
/// one tick is logged and never terminates the loop — the next tick starts
/// fresh.
pub async fn run(
    coordinator: Coordinator,
    cluster: Arc<ClusterTopology>,
    managed_root: PathBuf,
    working_set: Arc<WorkingSet>,
    http: reqwest::Client,
) {
    loop {
        coordinator.cleanup().await;

        let pending = coordinator.get_files_to_sync();
        working_set.publish(pending.keys().cloned().collect());

        for (path, entry) in pending {
            if let Err(err) = apply_entry(&coordinator, &cluster, &managed_root, &http, &path, &entry).await
            {
                warn!(%path, %err, "sync tick failed for entry, will retry next tick");
            }
        }

        tokio::time::sleep(TICK_INTERVAL).await;
    }
}

async fn apply_entry(
    coordinator: &Coordinator,
    cluster: &ClusterTopology,
    managed_root: &std::path::Path,
    http: &reqwest::Client,
    path: &RelativePath,
    entry: &PendingEntry,
) -> anyhow::Result<()> {
    match entry.event {
        ChangeEvent::Modified => {
            pull_from_a_peer(cluster, managed_root, http, path, entry).await?;
        }
        ChangeEvent::Deleted => {
            let target = managed_root.join(path.as_str());
            match tokio::fs::remove_file(&target).await {
                Ok(()) => info!(%path, "removed local file"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(%path, "already absent locally");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    coordinator.announce_acquisition(path.clone()).await;
    Ok(())
}

/// Bounded loop, not recursion, per the §9 redesign flag: a fresh random
/// peer is chosen each iteration and there is no retry ceiling — liveness
/// rests on at least one holder staying reachable.
async fn pull_from_a_peer(
    cluster: &ClusterTopology,
    managed_root: &std::path::Path,
    http: &reqwest::Client,
    path: &RelativePath,
    entry: &PendingEntry,
) -> anyhow::Result<()> {
    loop {
        let Some(peer) = choose_peer(cluster, entry) else {
            anyhow::bail!("no peer in synced_to is a known cluster member for {path}");
        };

        let url = format!("http://{}:{}/{}", peer.host, peer.file_port, path);
        match http.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.bytes().await {
                Ok(bytes) => {
                    let target = managed_root.join(path.as_str());
                    if let Some(parent) = target.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&target, &bytes).await?;
                    info!(%path, peer = %peer, "pulled file from peer");
                    return Ok(());
                }
                Err(err) => {
                    warn!(%path, peer = %peer, %err, "failed reading peer response body, retrying");
                }
            },
            Ok(response) => {
                warn!(%path, peer = %peer, status = %response.status(), "peer returned non-2xx, retrying");
            }
            Err(err) => {
                error!(%path, peer = %peer, %err, "peer unreachable, retrying with another peer");
            }
        }

        tokio::time::sleep(RETRY_BACKOFF).await;
    }
}

fn choose_peer<'a>(
    cluster: &'a ClusterTopology,
    entry: &PendingEntry,
) -> Option<&'a meshsync_core::Node> {
    let candidates: Vec<&meshsync_core::Node> = cluster
        .nodes()
        .iter()
        .filter(|node| entry.synced_to().iter().any(|id| node.id() == *id))
        .collect();
    candidates.choose(&mut rand::rng()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsync_core::{LoopbackConsensus, PendingMap};
    use std::sync::Arc as StdArc;

    fn cluster() -> ClusterTopology {
        ClusterTopology::parse(
            "localhost:10001:8081,localhost:10002:8082",
            "localhost",
            10001,
        )
        .unwrap()
    }

    #[test]
    fn choose_peer_picks_from_synced_to_members() {
        let cluster = cluster();
        let mut map = PendingMap::new();
        map.apply_announce_update(
            RelativePath::new("f.txt").unwrap(),
            "localhost:10002".into(),
            ChangeEvent::Modified,
        );
        let entry = map.get(&RelativePath::new("f.txt").unwrap()).unwrap();
        let peer = choose_peer(&cluster, entry).unwrap();
        assert_eq!(peer.id(), "localhost:10002");
    }

    #[test]
    fn choose_peer_returns_none_when_no_member_matches() {
        let cluster = cluster();
        let mut map = PendingMap::new();
        map.apply_announce_update(
            RelativePath::new("f.txt").unwrap(),
            "unknown:9999".into(),
            ChangeEvent::Modified,
        );
        let entry = map.get(&RelativePath::new("f.txt").unwrap()).unwrap();
        assert!(choose_peer(&cluster, entry).is_none());
    }

    #[tokio::test]
    async fn deleted_entry_removes_local_file_and_acknowledges() {
        let tmp = tempfile::tempdir().unwrap();
        let file_path = tmp.path().join("f.txt");
        std::fs::write(&file_path, b"bye").unwrap();

        let consensus = StdArc::new(LoopbackConsensus::new("localhost:10001", 1));
        let coordinator = Coordinator::new(consensus as StdArc<dyn meshsync_core::Consensus>);
        let path = RelativePath::new("f.txt").unwrap();
        let entry = pending_entry_for_test(ChangeEvent::Deleted);

        apply_entry(&coordinator, &cluster(), tmp.path(), &reqwest::Client::new(), &path, &entry)
            .await
            .unwrap();

        assert!(!file_path.exists());
    }

    fn pending_entry_for_test(event: ChangeEvent) -> PendingEntry {
        let mut map = PendingMap::new();
        let path = RelativePath::new("f.txt").unwrap();
        map.apply_announce_update(path.clone(), "localhost:10002".into(), event);
        map.get(&path).unwrap().clone()
    }
}
