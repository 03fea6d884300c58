//! Content digests.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of a byte stream.
///
/// Used both as the cache key and as the on-disk file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hash `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this digest with the given extension.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Parse a file name produced by [`ContentDigest::file_name`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDigest`] unless `name` is exactly
    /// `<64 lowercase hex>.<extension>`.
    pub fn from_file_name(name: &str, extension: &str) -> Result<Self, InvalidDigest> {
        name.strip_suffix(extension)
            .and_then(|stem| stem.strip_suffix('.'))
            .ok_or_else(|| InvalidDigest(name.to_string()))?
            .parse()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error parsing a digest string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid content digest: {0:?}")]
pub struct InvalidDigest(pub String);

impl FromStr for ContentDigest {
    type Err = InvalidDigest;

    /// Accepts exactly 64 lowercase hex characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == DIGEST_HEX_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidDigest(s.to_string()))
        }
    }
}
