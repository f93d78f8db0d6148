//! The content-addressed [`Hash`] type shared by every layer above the chunk store.
//!
//! A `Hash` is a 20-byte digest of a chunk's serialized bytes. It is never produced by
//! anything other than [`Hasher`] so that two processes hashing the same logical value
//! always agree bit-for-bit (spec.md §4.1, Testable Property 1).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Number of bytes in a [`Hash`]. Chosen to match the on-disk/wire format; changing this
/// changes every hash ever produced and is not a supported migration.
pub const HASH_LEN: usize = 20;

/// A 20-byte digest identifying a chunk by its content.
///
/// `Hash` is `Copy` and orders by raw byte value, which is also the tie-break order used
/// for ref comparisons in prolly-tree internal nodes (spec.md §4.3: "Ref keys compare by
/// (target height desc, hash asc)").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// The all-zero hash. Used as a sentinel "no parent" / "empty store root" value; it
    /// is never the hash of any chunk we write, since `Hasher` always mixes in the kind
    /// tag and payload of a real chunk.
    pub const EMPTY: Hash = Hash([0u8; HASH_LEN]);

    /// Hashes `bytes` in one shot. Equivalent to `Hasher::new().update(bytes).finalize()`.
    pub fn of_bytes(bytes: &[u8]) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Hash {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Hash::EMPTY
    }
}

/// Incremental hasher producing a [`Hash`]. Lets callers hash a chunk's kind tag and
/// payload without buffering the whole serialized form twice.
pub struct Hasher(Sha512);

impl Hasher {
    pub fn new() -> Hasher {
        Hasher(Sha512::new())
    }

    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(bytes);
        self
    }

    /// Digests are truncated SHA-512: the first 20 bytes of the 64-byte digest. Truncation
    /// of a strong hash is an accepted construction for content addressing (git and noms
    /// both do the same); the full digest is discarded.
    pub fn finalize(self) -> Hash {
        let full = self.0.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&full[..HASH_LEN]);
        Hash(out)
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Hasher::new()
    }
}

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", base32::encode(ALPHABET, &self.0).to_ascii_lowercase())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("invalid base32 hash string {0:?}")]
    InvalidBase32(String),
    #[error("decoded hash has {0} bytes, expected {HASH_LEN}")]
    WrongLength(usize),
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = base32::decode(ALPHABET, &s.to_ascii_uppercase())
            .ok_or_else(|| HashParseError::InvalidBase32(s.to_string()))?;
        if decoded.len() != HASH_LEN {
            return Err(HashParseError::WrongLength(decoded.len()));
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&decoded);
        Ok(Hash(out))
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_str(&s).map_err(serde::de::Error::custom)
    }
}
