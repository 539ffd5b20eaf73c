//! An in-process [`Transport`] wiring every node in the demo fleet together
//! directly through their [`Node`] handles, with no real networking (spec
//! §6: "any implementation may be substituted").

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use hgc_consensus_core::peer::PeerId;
use hgc_node::transport::{
    EagerSyncRequest, EagerSyncResponse, FastForwardRequest, FastForwardResponse, JoinRequest,
    JoinResponse, SyncRequest, SyncResponse, Transport, TransportError, TransportResult,
};
use hgc_node::Node;
use hgc_store::Store;
use tokio::sync::RwLock;

pub struct LoopbackNetwork<S> {
    nodes: RwLock<BTreeMap<PeerId, Arc<Node<S>>>>,
}

impl<S: Store> LoopbackNetwork<S> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { nodes: RwLock::new(BTreeMap::new()) })
    }

    pub async fn register(&self, id: PeerId, node: Arc<Node<S>>) {
        self.nodes.write().await.insert(id, node);
    }

    async fn get(&self, id: PeerId) -> TransportResult<Arc<Node<S>>> {
        self.nodes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("no such peer in this process: {id}")))
    }
}

#[async_trait]
impl<S: Store> Transport for LoopbackNetwork<S> {
    async fn sync(&self, target: PeerId, req: SyncRequest) -> TransportResult<SyncResponse> {
        let target_node = self.get(target).await?;
        let events = target_node
            .core()
            .event_diff(&req.known)
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let known = target_node
            .core()
            .known_events()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
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
        let (peers, frame, block) = target_node
            .accept_join(req.peer)
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        Ok(JoinResponse { accepted_round: frame.round, peers, frame, block })
    }
}
