use bincode::{Decode, Encode};

use crate::event::EventHash;

/// Fame tri-state of a witness (spec §3/§4.3).
#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fame {
    Undecided,
    Yes,
    No,
}

impl Fame {
    pub fn is_decided(self) -> bool {
        !matches!(self, Fame::Undecided)
    }
}

/// A witness hash together with its current fame decision.
#[derive(Encode, Decode, Clone, Debug)]
pub struct WitnessFame {
    pub hash: EventHash,
    pub fame: Fame,
}

/// Per-round bookkeeping: which events were created in the round, which
/// have been assigned this round as their round-received, and the fame
/// status of the round's witnesses (spec §3 "RoundInfo").
#[derive(Encode, Decode, Clone, Debug, Default)]
pub struct RoundInfo {
    pub created_events: Vec<EventHash>,
    pub received_events: Vec<EventHash>,
    pub witnesses: Vec<WitnessFame>,
    pub decided: bool,
    /// Set once the round has been handed to block/frame production.
    pub queued: bool,
}

impl RoundInfo {
    pub fn witness_fame(&self, hash: EventHash) -> Option<Fame> {
        self.witnesses
            .iter()
            .find(|w| w.hash == hash)
            .map(|w| w.fame)
    }

    pub fn set_witness_fame(&mut self, hash: EventHash, fame: Fame) {
        if let Some(w) = self.witnesses.iter_mut().find(|w| w.hash == hash) {
            w.fame = fame;
        } else {
            self.witnesses.push(WitnessFame { hash, fame });
        }
    }

    pub fn all_witnesses_decided(&self) -> bool {
        !self.witnesses.is_empty() && self.witnesses.iter().all(|w| w.fame.is_decided())
    }

    pub fn famous_witnesses(&self) -> impl Iterator<Item = EventHash> + '_ {
        self.witnesses
            .iter()
            .filter(|w| w.fame == Fame::Yes)
            .map(|w| w.hash)
    }
}
