//! Content-derived ids for claims and votes.

use crate::hex_serde;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed id: expected 64 hex characters, got {0:?}")]
pub struct ParseIdError(pub String);

/// Blake2b-256 of a claim's `(content, authorId, timestamp, stake)`.
///
/// Never changes for the life of the claim, including after tombstoning.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(#[serde(with = "hex_serde")] [u8; 32]);

/// Blake2b-256 of a vote's full data record.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoteId(#[serde(with = "hex_serde")] [u8; 32]);

macro_rules! content_id {
    ($name:ident) => {
        impl $name {
            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// First 8 hex characters, for log lines and history reasons.
            pub fn short(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                hex_serde::decode_fixed(s)
                    .map(Self)
                    .ok_or_else(|| ParseIdError(s.to_string()))
            }
        }
    };
}

content_id!(ClaimId);
content_id!(VoteId);
