use std::fmt;

use bincode::{Decode, Encode};

/// A content hash, displayed as uppercase hex prefixed with `0X` (spec
/// §4.2).
#[derive(Encode, Decode, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<blake3::Hash> for Hash32 {
    fn from(value: blake3::Hash) -> Self {
        Self(*value.as_bytes())
    }
}

impl From<Hash32> for blake3::Hash {
    fn from(value: Hash32) -> Self {
        blake3::Hash::from_bytes(value.0)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0X{}", data_encoding::HEXUPPER.encode(&self.0))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Default for Hash32 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Bitwise-XOR of a sequence of hashes, used to derive the per-round
/// whitening seed from famous-witness hashes (spec §4.3, §9).
pub fn xor_hashes(hashes: impl IntoIterator<Item = Hash32>) -> Hash32 {
    let mut acc = [0u8; 32];
    for h in hashes {
        for (a, b) in acc.iter_mut().zip(h.0.iter()) {
            *a ^= b;
        }
    }
    Hash32(acc)
}
