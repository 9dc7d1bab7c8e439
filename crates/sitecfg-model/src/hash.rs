//! Configuration fingerprints
//!
//! Provides [`ConfigFingerprint`], a 32-byte Blake3 digest over the canonical
//! form of a configuration document. Two documents with the same fingerprint
//! serialize to the same wire body.

use std::fmt::{self, Display, Formatter};

/// A 32-byte configuration fingerprint (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint([u8; 32]);

impl ConfigFingerprint {
    /// Compute Blake3 digest of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ConfigFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
