//! Cluster identity, the replicated pending-files map, and the coordination
//! logic that guards it with per-path advisory locks.
//!
//! The consensus engine itself is treated as an external collaborator: this
//! crate defines the [`consensus::Consensus`] trait it must implement and
//! ships [`local_consensus::LoopbackConsensus`], an in-process stand-in for
//! single-node demonstration and for the tests in this crate.

pub mod consensus;
pub mod coordinator;
pub mod error;
pub mod local_consensus;
pub mod node;
pub mod pending;

pub use consensus::{Consensus, LockGuard, Transition};
pub use coordinator::Coordinator;
pub use error::{CoreError, Result};
pub use local_consensus::LoopbackConsensus;
pub use node::Node;
pub use pending::{ChangeEvent, PendingEntry, PendingMap, RelativePath};
