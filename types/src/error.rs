//! The error taxonomy shared by every crate.
//!
//! Each crate has its own `thiserror` enum; all of them expose
//! `kind() -> ErrorKind` so callers (and the presentation layer) can
//! react to the category without matching on every variant.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input: empty content, unknown direction, zero vote count.
    Validation,
    /// The target is in the wrong state: sealed, already voted, not found.
    State,
    /// The requester may not perform the action (non-author delete).
    Authorization,
    /// Insufficient balance or stake.
    Economic,
    /// New-account cooldown or device already voted.
    SybilDefense,
    /// Signing or verification failure.
    Crypto,
    /// Persistence collaborator failure.
    Storage,
    /// Transport or codec failure.
    Network,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Authorization => "authorization",
            Self::Economic => "economic",
            Self::SybilDefense => "sybil-defense",
            Self::Crypto => "crypto",
            Self::Storage => "storage",
            Self::Network => "network",
        };
        f.write_str(s)
    }
}
