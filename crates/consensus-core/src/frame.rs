use bincode::{Decode, Encode};

use crate::event::{Event, Root, RoundNum};
use crate::peer::PeerPubkey;
use crate::peer_set::PeerSet;
use crate::signed::{Hashable, Signable};

/// State snapshot at a round-received boundary, sufficient together with
/// its corresponding [`crate::block::Block`] to bootstrap a new node
/// (spec §3 "Frame").
#[derive(Encode, Decode, Clone, Debug)]
pub struct Frame {
    pub round: RoundNum,
    /// Peer-sets effective at or before `round`; [`Frame::peer_set_at`]
    /// resolves the one effective at any given round the same way the
    /// store's peer-set schedule does.
    pub peer_sets: Vec<(RoundNum, PeerSet)>,
    pub roots: Vec<(PeerPubkey, Root)>,
    pub events: Vec<Event>,
}

impl Hashable for Frame {}
impl Signable for Frame {
    const TAG: [u8; 4] = *b"frme";
}

impl Frame {
    pub fn root_for(&self, creator: PeerPubkey) -> Option<&Root> {
        self.roots.iter().find(|(pk, _)| *pk == creator).map(|(_, r)| r)
    }

    pub fn peer_set_at(&self, round: RoundNum) -> Option<&PeerSet> {
        self.peer_sets
            .iter()
            .filter(|(r, _)| *r <= round)
            .max_by_key(|(r, _)| *r)
            .map(|(_, set)| set)
    }
}
