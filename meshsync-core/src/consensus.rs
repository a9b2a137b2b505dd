use async_trait::async_trait;

use crate::error::Result;
use crate::pending::{ChangeEvent, PendingMap, RelativePath};

/// A replicated state transition, applied atomically on every replica by the
/// consensus log (§4.B "Replicated transitions"). Named explicitly rather
/// than dispatched through per-method decorators, so the state machine stays
/// serializable and auditable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    AnnounceUpdate {
        path: RelativePath,
        source: String,
        event: ChangeEvent,
    },
    AnnounceAcquisition {
        path: RelativePath,
        node: String,
    },
    CleanupEntry {
        path: RelativePath,
    },
}

/// A held named advisory lock (`announce:<path>` / `cleanup:<path>`).
/// Dropping releases it early; otherwise the backend auto-expires it after
/// its own bounded timeout.
pub trait LockGuard: std::fmt::Debug + Send {}

/// The external collaborator spec.md places out of scope: "replicated log +
/// leader election + replicated registers + a distributed advisory lock
/// service." The [`Coordinator`](crate::coordinator::Coordinator) is written
/// against this trait so a real consensus engine can be substituted without
/// touching coordination logic.
#[async_trait]
pub trait Consensus: Send + Sync {
    /// This node's id, as rendered by [`crate::node::Node::id`].
    fn local_id(&self) -> &str;

    /// Number of members in the cluster, `N` in the invariants of §3.
    fn cluster_size(&self) -> usize;

    /// Need not be linearizable (§4.B) — the `cleanup:<path>` lock is the
    /// real safety net, this is only an optimization.
    async fn is_local_leader(&self) -> bool;

    /// Single non-blocking attempt. `None` if another holder has it.
    async fn try_lock(&self, name: &str) -> Option<Box<dyn LockGuard>>;

    /// Retries until acquired. Bounded in practice by every hold auto-
    /// expiring, never by giving up.
    async fn acquire_lock(&self, name: &str) -> Box<dyn LockGuard>;

    /// Submits a transition to the replicated log; resolves once committed.
    async fn submit(&self, transition: Transition) -> Result<()>;

    /// A snapshot copy of the replicated pending map.
    fn snapshot(&self) -> PendingMap;
}
