use hgc_consensus_core::event::{EventHash, EventIndex};
use hgc_consensus_core::peer::PeerId;
use hgc_store::StoreError;
use snafu::Snafu;

/// Raised when an event's self-parent cannot be resolved yet (spec §9).
#[derive(Debug, Clone, Snafu)]
pub enum SelfParentError {
    /// The parent simply has not arrived over gossip yet; the caller should
    /// hold the event and retry once more events land.
    #[snafu(display("self-parent of event from {creator} at index {index} not seen yet"))]
    Normal { creator: PeerId, index: EventIndex },
    /// The claimed parent chain can never resolve: a conflicting view of
    /// this creator's chain (fork or malformed claim).
    #[snafu(display("self-parent of event from {creator} at index {index} is invalid: {reason}"))]
    Abnormal {
        creator: PeerId,
        index: EventIndex,
        reason: String,
    },
}

impl SelfParentError {
    pub fn is_normal(&self) -> bool {
        matches!(self, SelfParentError::Normal { .. })
    }
}

#[derive(Debug, Snafu)]
pub enum InsertError {
    #[snafu(transparent)]
    Store { source: StoreError },
    #[snafu(display("self-parent unresolved for event from {creator}: {source}"))]
    SelfParent {
        creator: PeerId,
        source: SelfParentError,
    },
    #[snafu(display("other-parent {hash} of event from {creator} is unknown"))]
    UnknownOtherParent { creator: PeerId, hash: EventHash },
    #[snafu(display("event from {creator} at index {index} does not verify: {source}"))]
    InvalidSignature {
        creator: PeerId,
        index: EventIndex,
        source: hgc_consensus_core::signed::InvalidSignatureError,
    },
}

pub type InsertResult<T> = Result<T, InsertError>;

impl InsertError {
    /// Whether this failure is expected to clear itself once more events
    /// arrive over gossip, as opposed to indicating a broken or malicious
    /// peer (spec §4.4 failure classes).
    pub fn is_normal(&self) -> bool {
        matches!(self, InsertError::SelfParent { source, .. } if source.is_normal())
    }
}

#[derive(Debug, Snafu)]
pub enum ConsensusError {
    #[snafu(transparent)]
    Store { source: StoreError },
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
