use std::io::Write as _;
use std::ops;

use bincode::{Decode, Encode};
use k256::ecdsa::signature::hazmat::PrehashSigner as _;
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use snafu::{OptionExt as _, Snafu};

use crate::bincode::CONSENSUS_BINCODE_CONFIG;
use crate::peer::{PeerPubkey, PeerSeckey};

/// A 64-byte compact (`r || s`) secp256k1 ECDSA signature.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0X{}", data_encoding::HEXUPPER.encode(&self.0))
    }
}

impl From<EcdsaSignature> for Signature {
    fn from(value: EcdsaSignature) -> Self {
        Self(value.to_bytes().into())
    }
}

impl TryFrom<Signature> for EcdsaSignature {
    type Error = k256::ecdsa::Error;

    fn try_from(value: Signature) -> Result<Self, Self::Error> {
        EcdsaSignature::from_slice(&value.0)
    }
}

#[derive(Debug, Snafu)]
pub enum InvalidSignatureError {
    #[snafu(display("signature does not verify"))]
    Verification,
    #[snafu(display("signature is not canonical (high-S)"))]
    NonCanonical,
    #[snafu(display("malformed signature encoding"))]
    Malformed,
}

pub type InvalidSignatureResult<T> = Result<T, InvalidSignatureError>;

/// A value whose canonical-encoding hash is well-defined.
pub trait Hashable: bincode::Encode {
    fn hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        bincode::encode_into_std_write(self, &mut hasher, CONSENSUS_BINCODE_CONFIG)
            .expect("hashing can't fail");
        hasher.finalize()
    }
}

/// A message that can be signed/verified by a [`PeerPubkey`] identity, over
/// secp256k1 ECDSA with mandatory low-`S` normalization (spec §4.2).
pub trait Signable: Hashable {
    /// Domain-separation tag preventing two message types with identical
    /// encodings from colliding.
    const TAG: [u8; 4];

    fn sign_hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.write_all(b"hgc1").expect("can't fail");
        hasher.write_all(&Self::TAG).expect("can't fail");
        hasher
            .write_all(self.hash().as_bytes())
            .expect("can't fail");
        hasher.finalize()
    }

    fn sign_with(&self, seckey: PeerSeckey) -> Signature {
        let signing_key = SigningKey::from(seckey);
        let sig: EcdsaSignature = signing_key
            .sign_prehash(self.sign_hash().as_bytes())
            .expect("signing can't fail");
        // k256 always returns low-S signatures; assert the invariant rather
        // than silently relying on it.
        debug_assert!(sig.normalize_s().is_none(), "must already be low-S");
        sig.into()
    }

    fn verify_signature(&self, pubkey: PeerPubkey, sig: Signature) -> InvalidSignatureResult<()> {
        verify_hash_signature(self.sign_hash(), pubkey, sig)
    }
}

fn verify_hash_signature(
    hash: blake3::Hash,
    pubkey: PeerPubkey,
    sig: Signature,
) -> InvalidSignatureResult<()> {
    let ecdsa_sig = EcdsaSignature::try_from(sig).map_err(|_| InvalidSignatureError::Malformed)?;
    if ecdsa_sig.normalize_s().is_some() {
        return NonCanonicalSnafu.fail();
    }
    let verifying_key =
        VerifyingKey::try_from(pubkey).map_err(|_| InvalidSignatureError::Malformed)?;
    use k256::ecdsa::signature::hazmat::PrehashVerifier as _;
    verifying_key
        .verify_prehash(hash.as_bytes(), &ecdsa_sig)
        .ok()
        .context(VerificationSnafu)
}

#[derive(Decode, Encode, Clone, Debug)]
pub struct Signed<T> {
    pub inner: T,
    pub sig: Signature,
}

impl<T> Signed<T>
where
    T: Signable,
{
    pub fn new_sign(inner: T, seckey: PeerSeckey) -> Self {
        let sig = inner.sign_with(seckey);
        Self { inner, sig }
    }

    pub fn verify_sig(&self, pubkey: PeerPubkey) -> InvalidSignatureResult<()> {
        self.inner.verify_signature(pubkey, self.sig)
    }
}

impl<T> ops::Deref for Signed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
