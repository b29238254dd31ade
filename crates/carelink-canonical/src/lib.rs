//! Canonical value model and content hashing for Carelink.
//!
//! A contract fingerprint is `sha256(canonicalize(value))`, hex encoded.
//! Everything that feeds into that digest lives in this crate; changing the
//! canonical form invalidates every fingerprint already anchored.
//!
#![deny(missing_docs)]

/// Canonical string rendering and JSON conversion.
pub mod canonicalizer;
/// Content hash type and hasher.
pub mod digest;
/// Validation helpers used by canonical types.
pub mod validation;
/// Tagged-variant value model.
pub mod value;

pub use canonicalizer::{canonicalize, canonicalize_json, CanonicalizationError};
pub use digest::{ContentHash, ContentHasher, DigestAlg};
pub use validation::ValidationError;
pub use value::CanonicalValue;
