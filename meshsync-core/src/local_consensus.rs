use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::sleep;

use crate::consensus::{Consensus, LockGuard, Transition};
use crate::error::Result;
use crate::pending::PendingMap;

const LOCK_TTL: Duration = Duration::from_secs(5);
const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// An in-process stand-in for the consensus engine spec.md treats as an
/// external collaborator. Single replica, itself the permanent leader,
/// locks backed by a real expiry table rather than a distributed service.
///
/// This is a demonstration vehicle and a test double, not a substitute for
/// a real multi-node consensus engine: running the daemon with it across
/// multiple processes does not replicate state between them.
#[derive(Debug)]
pub struct LoopbackConsensus {
    local_id: String,
    cluster_size: usize,
    state: RwLock<PendingMap>,
    locks: Arc<Mutex<HashMap<String, Instant>>>,
}

impl LoopbackConsensus {
    pub fn new(local_id: impl Into<String>, cluster_size: usize) -> Self {
        Self {
            local_id: local_id.into(),
            cluster_size,
            state: RwLock::new(PendingMap::new()),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Consensus for LoopbackConsensus {
    fn local_id(&self) -> &str {
        &self.local_id
    }

    fn cluster_size(&self) -> usize {
        self.cluster_size
    }

    async fn is_local_leader(&self) -> bool {
        true
    }

    async fn try_lock(&self, name: &str) -> Option<Box<dyn LockGuard>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        let now = Instant::now();
        let expired = locks.get(name).map(|expiry| now >= *expiry).unwrap_or(true);
        if !expired {
            return None;
        }
        locks.insert(name.to_string(), now + LOCK_TTL);
        Some(Box::new(LoopbackLockGuard {
            locks: Arc::clone(&self.locks),
            name: name.to_string(),
        }))
    }

    async fn acquire_lock(&self, name: &str) -> Box<dyn LockGuard> {
        loop {
            if let Some(guard) = self.try_lock(name).await {
                return guard;
            }
            sleep(RETRY_INTERVAL).await;
        }
    }

    async fn submit(&self, transition: Transition) -> Result<()> {
        let mut state = self.state.write().expect("pending map poisoned");
        match transition {
            Transition::AnnounceUpdate { path, source, event } => {
                state.apply_announce_update(path, source, event);
            }
            Transition::AnnounceAcquisition { path, node } => {
                state.apply_announce_acquisition(&path, &node);
            }
            Transition::CleanupEntry { path } => {
                state.apply_cleanup(&path);
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> PendingMap {
        self.state.read().expect("pending map poisoned").clone()
    }
}

#[derive(Debug)]
struct LoopbackLockGuard {
    locks: Arc<Mutex<HashMap<String, Instant>>>,
    name: String,
}

impl LockGuard for LoopbackLockGuard {}

impl Drop for LoopbackLockGuard {
    fn drop(&mut self) {
        self.locks.lock().expect("lock table poisoned").remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::{ChangeEvent, RelativePath};

    #[tokio::test]
    async fn second_lock_attempt_fails_while_held() {
        let consensus = LoopbackConsensus::new("n1", 3);
        let guard = consensus.try_lock("announce:f.txt").await;
        assert!(guard.is_some());
        assert!(consensus.try_lock("announce:f.txt").await.is_none());
        drop(guard);
        assert!(consensus.try_lock("announce:f.txt").await.is_some());
    }

    #[tokio::test]
    async fn submit_applies_transitions_to_snapshot() {
        let consensus = LoopbackConsensus::new("n1", 3);
        let path = RelativePath::new("f.txt").unwrap();
        consensus
            .submit(Transition::AnnounceUpdate {
                path: path.clone(),
                source: "n1".into(),
                event: ChangeEvent::Modified,
            })
            .await
            .unwrap();
        let snapshot = consensus.snapshot();
        assert!(snapshot.get(&path).is_some());
    }

    #[tokio::test]
    async fn is_always_local_leader() {
        let consensus = LoopbackConsensus::new("n1", 1);
        assert!(consensus.is_local_leader().await);
    }
}
