//! `Transport` (spec §6): consumed, not implemented, by `Node`. Any
//! reliable bidirectional RPC mechanism may back it, provided payloads are
//! length-prefixed and preserve field ordering.

use async_trait::async_trait;
use hgc_consensus_core::block::Block;
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::peer::{Peer, PeerId};
use hgc_core::WireEvent;
use std::fmt;

#[derive(Debug, Clone)]
pub struct TransportError {
    pub reason: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Clone)]
pub struct SyncRequest {
    pub from_id: PeerId,
    pub known: std::collections::BTreeMap<PeerId, hgc_consensus_core::event::EventIndex>,
}

pub struct SyncResponse {
    pub from_id: PeerId,
    pub events: Vec<WireEvent>,
    pub known: std::collections::BTreeMap<PeerId, hgc_consensus_core::event::EventIndex>,
}

#[derive(Clone)]
pub struct EagerSyncRequest {
    pub from_id: PeerId,
    pub events: Vec<WireEvent>,
}

pub struct EagerSyncResponse {
    pub from_id: PeerId,
    pub success: bool,
}

pub struct FastForwardRequest {
    pub from_id: PeerId,
}

pub struct FastForwardResponse {
    pub from_id: PeerId,
    pub block: Block,
    pub frame: Frame,
}

pub struct JoinRequest {
    pub peer: Peer,
}

pub struct JoinResponse {
    pub accepted_round: hgc_consensus_core::event::RoundNum,
    pub peers: Vec<Peer>,
    pub frame: Frame,
    pub block: Block,
}

/// Every operation targets a peer by [`PeerId`]; resolving that into an
/// actual network address is the transport's business, not `Node`'s (spec
/// §6 `PeerAddr`/`AdvertiseAddr` are carried in the peer-set's `Peer`
/// records, which the transport implementation can look up itself).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn sync(&self, target: PeerId, req: SyncRequest) -> TransportResult<SyncResponse>;
    async fn eager_sync(&self, target: PeerId, req: EagerSyncRequest) -> TransportResult<EagerSyncResponse>;
    async fn fast_forward(&self, target: PeerId, req: FastForwardRequest) -> TransportResult<FastForwardResponse>;
    async fn join(&self, target: PeerId, req: JoinRequest) -> TransportResult<JoinResponse>;
}
