use hgc_consensus_core::peer::PeerId;
use hgc_core::errors::CoreError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum NodeInitError {
    #[snafu(transparent)]
    Core { source: CoreError },
    #[snafu(display("this validator is missing from the genesis peer-set and fast-sync/join are both disabled"))]
    MissingFromPeerSet,
}

pub type NodeInitResult<T> = Result<T, NodeInitError>;

#[derive(Debug, Snafu)]
pub enum GossipError {
    #[snafu(transparent)]
    Core { source: CoreError },
    #[snafu(display("transport call to peer {peer} timed out or failed: {reason}"))]
    Transport { peer: PeerId, reason: String },
    #[snafu(display("no peer other than ourselves is available to gossip with"))]
    NoPartner,
}

pub type GossipResult<T> = Result<T, GossipError>;

#[derive(Debug, Snafu)]
pub enum NodeJoinError {
    #[snafu(transparent)]
    Core { source: CoreError },
    #[snafu(display("join request to bootstrap peer {peer} failed: {reason}"))]
    Transport { peer: PeerId, reason: String },
    #[snafu(display("no block accepted our PEER_ADD within the join timeout"))]
    Timeout,
}

pub type NodeJoinResult<T> = Result<T, NodeJoinError>;
