use bincode::{Decode, Encode};
use hgc_util_array_type::array_type_fixed_size_define;

use crate::citem::InternalTransaction;
use crate::hash::Hash32;
use crate::peer::PeerPubkey;
use crate::signed::{Hashable, Signable, Signed};

pub type EventHash = Hash32;

array_type_fixed_size_define! {
    /// Monotonic per-creator event index; genesis is index 0.
    #[derive(Encode, Decode, Clone, Copy)]
    pub struct EventIndex(u64);
}

array_type_fixed_size_define! {
    /// A hashgraph round number.
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct RoundNum(u64);
}

/// A block signature gossiped alongside an event, feeding the same
/// dedup-by-`(block_index, signer)` pool as directly-submitted signatures
/// (spec §9, Open Question ii).
#[derive(Encode, Decode, Clone, Copy, Debug)]
pub struct CarriedBlockSignature {
    pub block_index: u64,
    pub signer: PeerPubkey,
    pub signature: crate::signed::Signature,
}

/// An opaque application payload carried by an event.
pub type TransactionPayload = Vec<u8>;

/// The signed portion of an [`Event`].
#[derive(Encode, Decode, Clone, Debug)]
pub struct EventBody {
    pub creator: PeerPubkey,
    pub index: EventIndex,
    /// Empty ([`Hash32::ZERO`]) for a genesis event.
    pub self_parent: Hash32,
    /// Empty for a genesis event; may also be empty for a "leaf" event
    /// that intentionally does not reference another creator yet.
    pub other_parent: Option<Hash32>,
    pub transactions: Vec<TransactionPayload>,
    pub internal_transactions: Vec<InternalTransaction>,
    pub block_signatures: Vec<CarriedBlockSignature>,
    pub timestamp: crate::timestamp::Timestamp,
}

impl Hashable for EventBody {}
impl Signable for EventBody {
    const TAG: [u8; 4] = *b"evnt";
}

impl EventBody {
    pub fn is_genesis(&self) -> bool {
        self.self_parent.is_zero()
    }
}

/// A signed DAG node: a single participant's contribution at a point in
/// time (spec §3/§4.2).
pub type Event = Signed<EventBody>;

pub trait EventExt {
    fn event_hash(&self) -> EventHash;
}

impl EventExt for Event {
    fn event_hash(&self) -> EventHash {
        self.inner.hash().into()
    }
}

/// A per-participant other-parent summary known at a [`crate::frame::Frame`]
/// boundary: just enough to let an event whose other-parent is below the
/// local horizon be validated without fetching the full ancestor chain.
#[derive(Encode, Decode, Clone, Debug)]
pub struct RootEventSummary {
    pub hash: EventHash,
    pub creator: PeerPubkey,
    pub index: EventIndex,
    pub round: RoundNum,
}

/// Per-participant bootstrap record describing where a participant's event
/// chain begins in the local store (spec §3 "Root"). Used both for
/// fast-sync and to validate events whose parents sit below the local
/// horizon.
#[derive(Encode, Decode, Clone, Debug)]
pub struct Root {
    /// Synthetic self-parent summary: the last event of this participant
    /// known as of the frame boundary.
    pub self_parent: RootEventSummary,
    /// Other-parent summaries this root provably knows, keyed by creator.
    pub others: Vec<(PeerPubkey, RootEventSummary)>,
}

impl Root {
    pub fn other(&self, creator: PeerPubkey) -> Option<&RootEventSummary> {
        self.others.iter().find(|(pk, _)| *pk == creator).map(|(_, s)| s)
    }
}
