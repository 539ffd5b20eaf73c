use hgc_consensus_core::block::{Block, BlockIndex};
use hgc_consensus_core::event::{Event, EventHash, EventIndex, Root, RoundNum};
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::peer::{Peer, PeerPubkey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_consensus_core::round_info::RoundInfo;
use hgc_util_db::def_table;

def_table! {
    /// Every event ever inserted, keyed by its canonical hash.
    events: EventHash => Event
}

def_table! {
    /// Per-participant event chain, for `participant_events`/`participant_event`.
    participant_events: (PeerPubkey, EventIndex) => EventHash
}

def_table! {
    /// Highest event index known for a participant; backs `known_events`.
    known_events: PeerPubkey => EventIndex
}

def_table! {
    /// Round of a participant's first (genesis) event; backs `first_round`.
    first_round: PeerPubkey => RoundNum
}

def_table! {
    /// Peer-set schedule: the set effective from `round` onward.
    peer_sets: RoundNum => PeerSet
}

def_table! {
    /// All peers ever seen, regardless of current membership.
    repertoire: PeerPubkey => Peer
}

def_table! {
    /// Per-round bookkeeping (witnesses, fame, received events).
    rounds: RoundNum => RoundInfo
}

def_table! {
    /// The final, globally-agreed event order, indexed by log position.
    consensus_log: u64 => EventHash
}

def_table! {
    /// Per-participant bootstrap root summary (spec §3 "Root").
    roots: PeerPubkey => Root
}

def_table! {
    /// Finalized blocks, keyed by block index.
    blocks: BlockIndex => Block
}

def_table! {
    /// Snapshot frames, keyed by the round they were produced at.
    frames: RoundNum => Frame
}

def_table! {
    /// Singleton counters/pointers, all keyed by `()`.
    last_round: () => RoundNum
}

def_table! {
    last_block_index: () => BlockIndex
}

def_table! {
    consensus_log_len: () => u64
}
