use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use hgc_util_array_type::array_type_fixed_size_define;

use crate::citem::BalletedInternalTransaction;
use crate::event::{EventHash, TransactionPayload};
use crate::hash::Hash32;
use crate::peer::PeerPubkey;
use crate::signed::{Hashable, Signable, Signature};
use crate::timestamp::Timestamp;

array_type_fixed_size_define! {
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct BlockIndex(u64);
}

pub type BlockHash = Hash32;
pub type StateHash = Hash32;
pub type PeerSetHash = Hash32;
pub type FrameHash = Hash32;

#[derive(Encode, Decode, Clone, Debug)]
pub struct BlockHeader {
    pub index: BlockIndex,
    pub round_received: crate::event::RoundNum,
    pub parent_hash: BlockHash,
    pub state_hash: StateHash,
    pub peer_set_hash: PeerSetHash,
    pub timestamp: Timestamp,
}

#[derive(Encode, Decode, Clone, Debug)]
pub struct BlockBody {
    pub transactions: Vec<TransactionPayload>,
    pub internal_transactions: Vec<BalletedInternalTransaction>,
    pub frame_hash: FrameHash,
}

/// The ordered batch of transactions at a round-received boundary (spec
/// §3 "Block"). Collects signatures from peers who have observed it as the
/// consensus output for its round-received.
#[derive(Encode, Decode, Clone, Debug)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
    pub signatures: BTreeMap<PeerPubkey, Signature>,
}

impl Hashable for BlockHeader {}
impl Signable for BlockHeader {
    const TAG: [u8; 4] = *b"blck";
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.hash().into()
    }

    pub fn add_signature(&mut self, signer: PeerPubkey, sig: Signature) -> bool {
        self.signatures.insert(signer, sig).is_none()
    }

    /// Whether the accumulated signatures reach a super-majority under the
    /// given peer-set size.
    pub fn has_super_majority(&self, peer_set: &crate::peer_set::PeerSet) -> bool {
        let valid = self
            .signatures
            .keys()
            .filter(|pk| peer_set.contains_pubkey(**pk))
            .count();
        peer_set.is_super_majority(valid)
    }
}

/// Committed events in the order the block carries; kept separately from
/// the [`Block`] itself since it is re-derivable from [`crate::frame::Frame`]
/// and the consensus log, but convenient to have at hand when producing a
/// block from a decided round.
#[derive(Debug, Clone)]
pub struct OrderedEvent {
    pub hash: EventHash,
    pub round_received: crate::event::RoundNum,
    pub consensus_timestamp: Timestamp,
}
