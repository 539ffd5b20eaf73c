use bincode::{Decode, Encode};

use crate::peer::Peer;

/// A peer-set change, gossiped alongside application transactions and
/// ordered by the same consensus (spec §4.3 "Internal transactions").
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub enum InternalTransactionKind {
    PeerAdd(Peer),
    PeerRemove(Peer),
}

/// An internal transaction as carried inside an [`crate::event::Event`]
/// body, before it has been committed to a block.
#[derive(Encode, Decode, Clone, Debug)]
pub struct InternalTransaction {
    pub kind: InternalTransactionKind,
}

impl InternalTransaction {
    pub fn peer_add(peer: Peer) -> Self {
        Self {
            kind: InternalTransactionKind::PeerAdd(peer),
        }
    }

    pub fn peer_remove(peer: Peer) -> Self {
        Self {
            kind: InternalTransactionKind::PeerRemove(peer),
        }
    }
}

/// Accept/reject ballot recorded once an [`InternalTransaction`] is
/// committed to a [`crate::block::Block`] body.
#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ballot {
    Accepted,
    Rejected,
}

/// An internal transaction together with its block-commit ballot.
#[derive(Encode, Decode, Clone, Debug)]
pub struct BalletedInternalTransaction {
    pub txn: InternalTransaction,
    pub ballot: Ballot,
}
