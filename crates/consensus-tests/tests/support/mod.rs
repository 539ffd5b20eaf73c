//! Shared scaffolding for the end-to-end scenarios (spec §8): a small
//! cluster of in-memory cores sharing one genesis peer-set, plus the
//! one-hop gossip helper every sync-style scenario is built out of.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use hgc_consensus_core::block::{Block, BlockIndex, StateHash};
use hgc_consensus_core::event::RoundNum;
use hgc_consensus_core::peer::{Peer, PeerId, PeerSeckey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_core::gateway::{AppGateway, CommitOutcome, GatewayResult, NodeState};
use hgc_core::Core;
use hgc_node::transport::{
    EagerSyncRequest, EagerSyncResponse, FastForwardRequest, FastForwardResponse, JoinRequest,
    JoinResponse, SyncRequest, SyncResponse, Transport, TransportError, TransportResult,
};
use hgc_node::Node;
use hgc_store::memory::InMemoryStore;
use hgc_store::Store as _;
use hgc_util_error::WhateverResult;
use hgc_validator::Validator;
use snafu::ResultExt as _;
use tokio::sync::RwLock;

pub struct NullGateway;

#[async_trait]
impl AppGateway for NullGateway {
    async fn commit_block(&self, _block: &Block) -> GatewayResult<CommitOutcome> {
        Ok(CommitOutcome { state_hash: StateHash::ZERO, accepted_internal_transactions: vec![] })
    }

    async fn get_snapshot(&self, _index: BlockIndex) -> GatewayResult<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn restore(&self, _snapshot: &[u8]) -> GatewayResult<StateHash> {
        Ok(StateHash::ZERO)
    }

    async fn on_state_changed(&self, _state: NodeState) {}
}

/// A small cluster of cores, all seeded with the same genesis peer-set and
/// repertoire, for scenarios that drive consensus directly through `Core`
/// rather than through the full node state machine.
pub struct Cluster {
    pub peers: Vec<Peer>,
    pub genesis: PeerSet,
    pub cores: Vec<Arc<Core<InMemoryStore>>>,
}

impl Cluster {
    pub async fn bootstrap(n: usize) -> WhateverResult<Self> {
        let mut seckeys: Vec<_> = (0..n).map(|_| PeerSeckey::generate()).collect();
        // Peers are identified by PeerId, which is a hash of the pubkey; sort
        // up front so the cluster's member order is stable and reproducible.
        seckeys.sort_unstable_by_key(|s| s.pubkey());

        let peers: Vec<_> = seckeys
            .iter()
            .enumerate()
            .map(|(i, s)| Peer::new(s.pubkey(), format!("mem://{i}"), format!("peer-{i}")))
            .collect();
        let genesis = PeerSet::new(peers.clone()).whatever_context("building genesis peer-set")?;

        let mut cores = Vec::with_capacity(n);
        for (i, seckey) in seckeys.into_iter().enumerate() {
            let store = Arc::new(InMemoryStore::new());
            store
                .set_peer_set(RoundNum::from(0u64), genesis.clone())
                .await
                .whatever_context("seeding genesis peer-set")?;
            for peer in &peers {
                store.add_to_repertoire(peer.clone()).await.whatever_context("seeding repertoire")?;
            }
            let validator = Validator::new(seckey, format!("peer-{i}"));
            let core = Core::new(store, validator, Arc::new(NullGateway))
                .await
                .whatever_context("starting core")?;
            cores.push(Arc::new(core));
        }

        Ok(Self { peers, genesis, cores })
    }

    pub fn id(&self, i: usize) -> PeerId {
        self.peers[i].id()
    }
}

/// One gossip round, `from -> to`, exactly mirroring the `Transport::sync`
/// hop `hgc-node`'s gossip loop makes against a real transport, minus the
/// network itself: ask `to` what it already knows, fetch what `from` has
/// beyond that, and hand it over.
pub async fn gossip(from: &Core<InMemoryStore>, to: &Core<InMemoryStore>) -> WhateverResult<()> {
    let to_known = to.known_events().await.whatever_context("known_events")?;
    let diff = from.event_diff(&to_known).await.whatever_context("event_diff")?;
    to.sync(from.validator().id(), diff).await.whatever_context("sync")?;
    Ok(())
}

/// An in-process [`Transport`] wiring every [`Node`] in a scenario together
/// directly by [`PeerId`], with no real networking: the same shape as
/// `hgc-node-bin`'s own `LoopbackNetwork`, reimplemented here since that one
/// lives in a binary crate this test crate can't depend on.
pub struct LoopbackNetwork {
    nodes: RwLock<BTreeMap<PeerId, Arc<Node<InMemoryStore>>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { nodes: RwLock::new(BTreeMap::new()) })
    }

    pub async fn register(&self, id: PeerId, node: Arc<Node<InMemoryStore>>) {
        self.nodes.write().await.insert(id, node);
    }

    async fn get(&self, id: PeerId) -> TransportResult<Arc<Node<InMemoryStore>>> {
        self.nodes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("no such peer in this process: {id}")))
    }
}

#[async_trait]
impl Transport for LoopbackNetwork {
    async fn sync(&self, target: PeerId, req: SyncRequest) -> TransportResult<SyncResponse> {
        let target_node = self.get(target).await?;
        let events =
            target_node.core().event_diff(&req.known).await.map_err(|e| TransportError::new(e.to_string()))?;
        let known = target_node.core().known_events().await.map_err(|e| TransportError::new(e.to_string()))?;
        Ok(SyncResponse { from_id: target, events, known })
    }

    async fn eager_sync(&self, target: PeerId, req: EagerSyncRequest) -> TransportResult<EagerSyncResponse> {
        let target_node = self.get(target).await?;
        match target_node.core().sync(req.from_id, req.events).await {
            Ok(_blocks) => Ok(EagerSyncResponse { from_id: target, success: true }),
            Err(_) => Ok(EagerSyncResponse { from_id: target, success: false }),
        }
    }

    async fn fast_forward(&self, target: PeerId, _req: FastForwardRequest) -> TransportResult<FastForwardResponse> {
        let target_node = self.get(target).await?;
        let bundle = target_node
            .core()
            .hashgraph()
            .get_anchor_block_with_frame()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let (block, frame) = bundle.ok_or_else(|| TransportError::new("peer has no anchor block yet"))?;
        Ok(FastForwardResponse { from_id: target, block, frame })
    }

    async fn join(&self, target: PeerId, req: JoinRequest) -> TransportResult<JoinResponse> {
        let target_node = self.get(target).await?;
        let (peers, frame, block) =
            target_node.accept_join(req.peer).await.map_err(|e| TransportError::new(e.to_string()))?;
        Ok(JoinResponse { accepted_round: frame.round, peers, frame, block })
    }
}
