//! Identity ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable id of an identity: the first 8 bytes of the Blake2b-256 digest
/// of its public key, as 16 lowercase hex characters.
///
/// Derivation lives in `rumorality_crypto::derive_identity_id`; this type
/// only carries the string. Peers are addressed by the same id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(String);

impl IdentityId {
    /// Length of a well-formed id in hex characters.
    pub const LEN: usize = 16;

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id has the derived shape (16 lowercase hex characters).
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::LEN
            && self.0.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// First 8 characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_ids() {
        assert!(IdentityId::new("0123456789abcdef").is_well_formed());
        assert!(!IdentityId::new("0123456789ABCDEF").is_well_formed());
        assert!(!IdentityId::new("").is_well_formed());
        assert!(!IdentityId::new("0123").is_well_formed());
    }

    #[test]
    fn short_form_never_panics() {
        assert_eq!(IdentityId::new("abc").short(), "abc");
        assert_eq!(IdentityId::new("0123456789abcdef").short(), "01234567");
    }
}
