use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

use crate::canonicalizer::{canonicalize, CanonicalizationError};
use crate::validation::ValidationError;
use crate::value::CanonicalValue;

/// Supported digest algorithms for content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlg {
    /// SHA-256, the only algorithm anchored so far.
    #[serde(rename = "sha-256")]
    Sha256,
}

impl DigestAlg {
    /// Length of the hex encoding produced by this algorithm.
    pub const fn hex_len(self) -> usize {
        match self {
            DigestAlg::Sha256 => 64,
        }
    }
}

static HEX_DIGEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").expect("invalid regex"));

/// SHA-256 digest encoded as 64 lowercase hex characters.
///
/// This is the externally visible fingerprint format; anything already
/// anchored depends on it staying byte-for-byte stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Parses a validated lowercase hex digest.
    pub fn parse(hex: impl Into<String>) -> Result<Self, ValidationError> {
        let hex = hex.into();
        if !HEX_DIGEST.is_match(&hex) {
            return Err(ValidationError::PatternMismatch {
                field: "content_hash",
                value: hex,
            });
        }
        Ok(Self(hex))
    }

    /// Algorithm that produced this digest.
    pub fn alg(&self) -> DigestAlg {
        DigestAlg::Sha256
    }

    /// Hex string view.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.0
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes content hashes over canonical strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Hashes an already-canonical string.
    pub fn hash_str(canonical: &str) -> ContentHash {
        let digest = Sha256::digest(canonical.as_bytes());
        ContentHash(hex::encode(digest))
    }

    /// Canonicalizes `value` and hashes the result.
    pub fn hash_value(value: &CanonicalValue) -> Result<ContentHash, CanonicalizationError> {
        Ok(Self::hash_str(&canonicalize(value)?))
    }
}
