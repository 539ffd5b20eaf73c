//! The per-node façade driving one participant's view of consensus (spec
//! §4.4 "Core"): owns the local signing identity, the hashgraph, and the
//! pools bridging it to the application and the gossip layer.

pub mod errors;
pub mod gateway;
pub mod pools;

mod fast_forward;
mod insert;
mod known;
mod sigpool;
mod sync;


pub use gateway::{AppGateway, CommitOutcome, GatewayError, NodeState};
pub use sync::WireEvent;

use std::sync::Arc;

use hgc_consensus_core::citem::InternalTransaction;
use hgc_consensus_core::event::{EventHash, EventIndex, TransactionPayload};
use hgc_hashgraph::Hashgraph;
use hgc_store::Store;
use hgc_validator::Validator;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::errors::CoreResult;
use crate::pools::{PendingPool, SignaturePool};

pub const LOG_TARGET: &str = "hgc::core";

/// This node's latest self-authored event, or `None` before genesis.
#[derive(Debug, Clone, Copy)]
struct Head {
    hash: EventHash,
    seq: EventIndex,
}

pub struct Core<S> {
    validator: Validator,
    hashgraph: Hashgraph<S>,
    gateway: Arc<dyn AppGateway>,
    /// Guards every hashgraph-mutating call; at most one writer at a time
    /// (spec §5 "insertEventAndRunConsensus is serialized").
    write_lock: AsyncMutex<()>,
    head: RwLock<Option<Head>>,
    pub(crate) pending_transactions: PendingPool<TransactionPayload>,
    pub(crate) pending_internal_transactions: PendingPool<InternalTransaction>,
    pub(crate) signature_pool: SignaturePool,
}

impl<S: Store> Core<S> {
    /// Builds a `Core` over an already-initialized store: genesis, if any,
    /// must already be inserted. `head`/`seq` are recovered from the
    /// store's own bookkeeping rather than tracked redundantly on disk.
    pub async fn new(store: Arc<S>, validator: Validator, gateway: Arc<dyn AppGateway>) -> CoreResult<Self> {
        let hashgraph = Hashgraph::new(store);
        let head = Self::recover_head(&hashgraph, &validator).await?;
        Ok(Self {
            validator,
            hashgraph,
            gateway,
            write_lock: AsyncMutex::new(()),
            head: RwLock::new(head),
            pending_transactions: PendingPool::default(),
            pending_internal_transactions: PendingPool::default(),
            signature_pool: SignaturePool::default(),
        })
    }

    async fn recover_head(hashgraph: &Hashgraph<S>, validator: &Validator) -> CoreResult<Option<Head>> {
        let known = hashgraph.store().known_events().await?;
        let Some(&seq) = known.get(&validator.id()) else {
            return Ok(None);
        };
        let hash = hashgraph
            .store()
            .participant_event(validator.pubkey(), seq)
            .await?;
        Ok(hash.map(|hash| Head { hash, seq }))
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn hashgraph(&self) -> &Hashgraph<S> {
        &self.hashgraph
    }

    pub fn store(&self) -> &Arc<S> {
        self.hashgraph.store()
    }

    /// Hash and index of this node's latest self-event, if any has been
    /// created yet (spec §4.4 `head`/`seq`).
    pub fn head(&self) -> Option<(EventHash, EventIndex)> {
        self.head.read().map(|h| (h.hash, h.seq))
    }

    pub fn queue_transaction(&self, payload: TransactionPayload) {
        self.pending_transactions.push(payload);
    }

    pub fn queue_internal_transaction(&self, txn: InternalTransaction) {
        self.pending_internal_transactions.push(txn);
    }

    /// Whether a self-event would carry anything besides a bare heartbeat,
    /// used by the gossip layer to pick `HeartbeatTimeout` over
    /// `SlowHeartbeatTimeout` (spec §4.5 step 1).
    pub fn has_pending_work(&self) -> bool {
        !self.pending_transactions.is_empty() || !self.pending_internal_transactions.is_empty()
    }

    fn set_head(&self, hash: EventHash, seq: EventIndex) {
        *self.head.write() = Some(Head { hash, seq });
    }
}
