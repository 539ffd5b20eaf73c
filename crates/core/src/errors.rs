use hgc_consensus_core::block::BlockIndex;
use hgc_consensus_core::event::EventIndex;
use hgc_consensus_core::peer::PeerId;
use hgc_hashgraph::errors::{ConsensusError, InsertError};
use hgc_store::StoreError;
use snafu::Snafu;

use crate::gateway::GatewayError;

#[derive(Debug, Snafu)]
pub enum CoreError {
    #[snafu(transparent)]
    Insert { source: InsertError },
    #[snafu(transparent)]
    Consensus { source: ConsensusError },
    #[snafu(transparent)]
    Store { source: StoreError },
    #[snafu(transparent)]
    Gateway { source: GatewayError },
    #[snafu(display(
        "wire event from {creator} at index {index} references an other-parent \
         ({other_creator}, {other_index}) we don't have"
    ))]
    UnknownWireParent {
        creator: PeerId,
        index: EventIndex,
        other_creator: PeerId,
        other_index: EventIndex,
    },
    #[snafu(display(
        "block {index}'s signatures do not reach a super-majority under the frame's peer-set"
    ))]
    InsufficientSignatures { index: BlockIndex },
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether this failure is expected to clear itself once more events
    /// arrive over gossip (spec §4.4 failure classes), as opposed to a
    /// protocol violation or storage fault that the Node layer must act on.
    pub fn is_normal(&self) -> bool {
        matches!(self, CoreError::Insert { source } if source.is_normal())
    }
}
