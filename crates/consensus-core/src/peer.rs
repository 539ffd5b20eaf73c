use core::fmt;

use bincode::{Decode, Encode};
use hgc_util_array_type::{
    array_type_define, array_type_impl_base32_str, array_type_impl_debug_as_display,
    array_type_impl_serde, array_type_impl_zero_default,
};
use k256::ecdsa::{SigningKey, VerifyingKey};
use snafu::Snafu;

/// A participant's stable 32-bit identity, derived from the first four
/// bytes of `blake3(pubkey)`.
///
/// Unlike a position-in-vector index, this survives peer-set changes:
/// the same peer keeps the same [`PeerId`] across every [`PeerSet`] it is
/// ever a member of.
///
/// [`PeerSet`]: crate::peer_set::PeerSet
#[derive(Encode, Decode, PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct PeerId(u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:08x}", self.0))
    }
}

impl PeerId {
    pub fn from_pubkey(pubkey: PeerPubkey) -> Self {
        let hash = blake3::hash(pubkey.as_slice());
        let bytes: [u8; 4] = hash.as_bytes()[0..4].try_into().expect("4 bytes");
        Self(u32::from_be_bytes(bytes))
    }
}

array_type_define! {
    /// Compressed secp256k1 public key (SEC1, 33 bytes).
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct PeerPubkey[33];
}

impl PeerPubkey {
    pub fn id(self) -> PeerId {
        PeerId::from_pubkey(self)
    }

    pub fn to_short(self) -> PeerPubkeyShort {
        PeerPubkeyShort(self)
    }
}

pub struct PeerPubkeyShort(PeerPubkey);

impl fmt::Display for PeerPubkeyShort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}...{}",
            data_encoding::BASE32_DNSCURVE.encode_display(&self.0.as_slice()[0..4]),
            data_encoding::BASE32_DNSCURVE.encode_display(&self.0.as_slice()[29..33])
        ))
    }
}

array_type_impl_zero_default!(PeerPubkey);
array_type_impl_base32_str!(PeerPubkey);
array_type_impl_serde!(PeerPubkey);
array_type_impl_debug_as_display!(PeerPubkey);

#[derive(Debug, Snafu)]
pub struct InvalidPubkeyError;

impl TryFrom<PeerPubkey> for VerifyingKey {
    type Error = InvalidPubkeyError;

    fn try_from(value: PeerPubkey) -> Result<Self, Self::Error> {
        VerifyingKey::from_sec1_bytes(value.as_slice()).map_err(|_| InvalidPubkeyError)
    }
}

array_type_define! {
    #[derive(Encode, Decode, Clone, Copy)]
    pub struct PeerSeckey[32];
}

impl PeerSeckey {
    pub fn generate() -> Self {
        Self(SigningKey::random(&mut rand::thread_rng()).to_bytes().into())
    }

    pub fn pubkey(self) -> PeerPubkey {
        let verifying_key = SigningKey::from(self).verifying_key().to_owned();
        let sec1 = verifying_key.to_encoded_point(true);
        let mut bytes = [0u8; PeerPubkey::LEN];
        bytes.copy_from_slice(sec1.as_bytes());
        PeerPubkey::from_bytes(bytes)
    }
}

impl From<PeerSeckey> for SigningKey {
    fn from(value: PeerSeckey) -> Self {
        SigningKey::from_bytes((&value.0).into()).expect("Valid scalar by construction")
    }
}

array_type_impl_zero_default!(PeerSeckey);

/// A participant: a public key, a network address hint, and a
/// human-readable label.
///
/// Peers are equal iff their public keys are equal (spec §3).
#[derive(Encode, Decode, Clone, Debug)]
pub struct Peer {
    pub pubkey: PeerPubkey,
    pub address: String,
    pub moniker: String,
}

impl Peer {
    pub fn new(pubkey: PeerPubkey, address: impl Into<String>, moniker: impl Into<String>) -> Self {
        Self {
            pubkey,
            address: address.into(),
            moniker: moniker.into(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.pubkey.id()
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.pubkey == other.pubkey
    }
}
impl Eq for Peer {}
