//! The local signing identity (spec §4.6): a secret key, a human-readable
//! moniker, and the derived public identifiers cached at construction time
//! so hot paths (logging, event signing) never recompute them.

use hgc_consensus_core::peer::{PeerId, PeerPubkey, PeerSeckey};

#[derive(Clone)]
pub struct Validator {
    seckey: PeerSeckey,
    moniker: String,
    pubkey: PeerPubkey,
    id: PeerId,
    pubkey_hex: String,
}

impl Validator {
    pub fn new(seckey: PeerSeckey, moniker: impl Into<String>) -> Self {
        let pubkey = seckey.pubkey();
        let id = pubkey.id();
        let pubkey_hex = data_encoding::HEXLOWER.encode(pubkey.as_slice());
        Self {
            seckey,
            moniker: moniker.into(),
            pubkey,
            id,
            pubkey_hex,
        }
    }

    pub fn seckey(&self) -> PeerSeckey {
        self.seckey
    }

    pub fn pubkey(&self) -> PeerPubkey {
        self.pubkey
    }

    /// Stable identity, equal to this validator's `PeerId` in any peer-set
    /// it is a member of (spec §4.6).
    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    pub fn pubkey_hex(&self) -> &str {
        &self.pubkey_hex
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("id", &self.id)
            .field("moniker", &self.moniker)
            .field("pubkey", &self.pubkey_hex)
            .finish()
    }
}

impl std::fmt::Display for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.moniker, self.id)
    }
}
