use serde::{Deserialize, Serialize};
use std::fmt;

/// A named group of records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// The local identity, keyed by a fixed slot name.
    Identity,
    /// Reputation accounts, keyed by identity id.
    Reputation,
    /// Claims, keyed by claim id hex.
    Claims,
    /// Votes, keyed by vote id hex.
    Votes,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Identity,
        Collection::Reputation,
        Collection::Claims,
        Collection::Votes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Reputation => "reputation",
            Self::Claims => "claims",
            Self::Votes => "votes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
