//! The application-facing surface consumed by [`crate::Core`] (spec §6
//! "AppGateway") and the node-level states it drives (spec §4.5).

use async_trait::async_trait;
use hgc_consensus_core::block::{Block, BlockIndex, StateHash};
use hgc_consensus_core::citem::InternalTransaction;
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum GatewayError {
    #[snafu(display("application rejected commit of block {index}: {reason}"))]
    Commit { index: BlockIndex, reason: String },
    #[snafu(display("application could not produce a snapshot at block {index}: {reason}"))]
    Snapshot { index: BlockIndex, reason: String },
    #[snafu(display("application could not restore from snapshot: {reason}"))]
    Restore { reason: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// What `CommitBlock` hands back once the application has applied a block's
/// transactions (spec §6): the resulting state hash, folded into the block
/// header, and which of the block's internal transactions the application
/// itself recognizes as accepted (echoed back for the application's own
/// bookkeeping; the hashgraph has already decided ballots structurally by
/// the time a block exists, see `hgc-hashgraph`'s `DESIGN.md` entry).
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub state_hash: StateHash,
    pub accepted_internal_transactions: Vec<InternalTransaction>,
}

/// The node states an `AppGateway` may be notified about (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Babbling,
    CatchingUp,
    Joining,
    Leaving,
    Suspended,
    Shutdown,
}

/// The application hosted by a node: receives committed blocks, serves
/// snapshots for fast-sync, and is notified of state transitions (spec §6).
///
/// `commit_block` must be idempotent per block index: `Core` may call it
/// again for the same index after a crash recovery before the block was
/// durably marked committed.
#[async_trait]
pub trait AppGateway: Send + Sync {
    async fn commit_block(&self, block: &Block) -> GatewayResult<CommitOutcome>;
    async fn get_snapshot(&self, index: BlockIndex) -> GatewayResult<Vec<u8>>;
    async fn restore(&self, snapshot: &[u8]) -> GatewayResult<StateHash>;
    /// Best-effort notification; failures here never affect consensus.
    async fn on_state_changed(&self, state: NodeState);
}
