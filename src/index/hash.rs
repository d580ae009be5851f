//! Fixed-width index keys.
//!
//! Words and URLs are addressed by 12-byte ASCII hashes. The fixed width is what
//! lets them live inside a [`ChunkIndex`](super::chunk::ChunkIndex) as records.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Width in bytes of every word and URL hash.
pub const HASH_LEN: usize = 12;

fn digest12(input: &str) -> [u8; HASH_LEN] {
    let digest = Sha256::digest(input.as_bytes());
    let encoded = hex::encode(&digest[..HASH_LEN / 2]);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

fn parse12(s: &str) -> Result<[u8; HASH_LEN], HashParseError> {
    let bytes = s.as_bytes();
    if bytes.len() != HASH_LEN {
        return Err(HashParseError::Length(bytes.len()));
    }
    if !bytes.iter().all(u8::is_ascii_graphic) {
        return Err(HashParseError::Charset);
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(bytes);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    #[error("hash must be {HASH_LEN} bytes, got {0}")]
    Length(usize),
    #[error("hash must be printable ASCII")]
    Charset,
}

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; HASH_LEN]);

        impl $name {
            /// Wraps raw key bytes. Returns `None` unless exactly [`HASH_LEN`] bytes.
            pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
                <[u8; HASH_LEN]>::try_from(bytes).ok().map(Self)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn as_str(&self) -> &str {
                // Constructors only admit ASCII.
                std::str::from_utf8(&self.0).unwrap_or_default()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HashParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse12(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hash_type!(
    /// Key of a reference container: identifies one indexed word.
    WordHash
);

hash_type!(
    /// Identifies one document URL. Postings and metadata entries point at it.
    UrlHash
);

impl WordHash {
    /// Hashes a word after lowercasing it, so lookups are case-insensitive.
    pub fn of_word(word: &str) -> Self {
        Self(digest12(&word.to_lowercase()))
    }
}

impl UrlHash {
    /// Hashes the normalized serialization of `url`.
    pub fn of_url(url: &url::Url) -> Self {
        Self(digest12(url.as_str()))
    }
}
