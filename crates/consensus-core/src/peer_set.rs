use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use snafu::Snafu;

use crate::peer::{Peer, PeerId, PeerPubkey};
use crate::signed::Hashable;

/// Immutable, ordered set of participants, dual-indexed by [`PeerId`] and by
/// [`PeerPubkey`].
///
/// Membership changes never mutate a `PeerSet` in place; they produce a new
/// one (spec §3). Every peer carries equal voting weight: `n` is simply the
/// peer count.
#[derive(Debug, Clone, Encode, Decode)]
pub struct PeerSet {
    peers: Vec<Peer>,
    by_id: BTreeMap<PeerId, usize>,
}

impl Hashable for PeerSet {}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum PeerSetError {
    DuplicateId { id: PeerId },
}

impl PeerSet {
    pub fn new(peers: Vec<Peer>) -> Result<Self, PeerSetError> {
        let mut by_id = BTreeMap::new();
        for (idx, peer) in peers.iter().enumerate() {
            if by_id.insert(peer.id(), idx).is_some() {
                return Err(PeerSetError::DuplicateId { id: peer.id() });
            }
        }
        Ok(Self { peers, by_id })
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    /// Total number of peers (`n` in spec §3).
    pub fn n(&self) -> usize {
        self.peers.len()
    }

    /// `2*n/3 + 1`, the number of peers required for a super-majority.
    pub fn super_majority(&self) -> usize {
        2 * self.n() / 3 + 1
    }

    /// `ceil(n/3)`, the maximum number of faulty peers tolerated.
    pub fn trust_count(&self) -> usize {
        self.n().div_ceil(3)
    }

    pub fn by_id(&self, id: PeerId) -> Option<&Peer> {
        self.by_id.get(&id).map(|&idx| &self.peers[idx])
    }

    pub fn by_pubkey(&self, pubkey: PeerPubkey) -> Option<&Peer> {
        self.peers.iter().find(|p| p.pubkey == pubkey)
    }

    pub fn contains_pubkey(&self, pubkey: PeerPubkey) -> bool {
        self.by_pubkey(pubkey).is_some()
    }

    pub fn contains_id(&self, id: PeerId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Whether `weight` peers (by count, out of `n`) constitute a
    /// super-majority.
    pub fn is_super_majority(&self, weight: usize) -> bool {
        weight >= self.super_majority()
    }

    pub fn with_added(&self, peer: Peer) -> Result<Self, PeerSetError> {
        let mut peers = self.peers.clone();
        peers.push(peer);
        Self::new(peers)
    }

    pub fn with_removed(&self, pubkey: PeerPubkey) -> Self {
        let peers: Vec<_> = self
            .peers
            .iter()
            .filter(|p| p.pubkey != pubkey)
            .cloned()
            .collect();
        Self::new(peers).expect("Removing a peer cannot introduce a duplicate id")
    }
}

#[cfg(test)]
mod tests;
