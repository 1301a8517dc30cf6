//! Reputation accounts and their append-only history.

use rumorality_types::{ClaimId, IdentityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Gain,
    Loss,
    Decay,
}

/// Why a balance changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    /// Stake committed to a post or a vote on the claim.
    Stake { claim: Option<ClaimId> },
    /// Winning side of a sealed claim: stake back plus pool share.
    VoteWon { claim: ClaimId },
    /// Losing side of a sealed claim. The stake was already debited.
    VoteLost { claim: ClaimId },
    /// Stake returned on a tie.
    TieRefund { claim: ClaimId },
    /// Author's post stake returned on a verified-true outcome.
    ClaimVerified { claim: ClaimId },
    Slashed(String),
    /// Progressive penalty applied after a slash on a high balance.
    HighRepPenalty,
    Decay,
    Manual(String),
}

impl Reason {
    /// Whether the entry records a resolved vote (won, lost, or slashed).
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::VoteWon { .. } | Self::VoteLost { .. } | Self::Slashed(_))
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stake { claim: Some(c) } => write!(f, "stake on {}", c.short()),
            Self::Stake { claim: None } => f.write_str("stake"),
            Self::VoteWon { claim } => write!(f, "vote won on {}", claim.short()),
            Self::VoteLost { claim } => write!(f, "vote lost on {}", claim.short()),
            Self::TieRefund { claim } => write!(f, "tie refund on {}", claim.short()),
            Self::ClaimVerified { claim } => write!(f, "claim {} verified", claim.short()),
            Self::Slashed(why) => write!(f, "slashed: {why}"),
            Self::HighRepPenalty => f.write_str("high reputation penalty"),
            Self::Decay => f.write_str("decay"),
            Self::Manual(why) => write!(f, "reward: {why}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub amount: u64,
    pub reason: Reason,
    pub kind: EntryKind,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationAccount {
    pub identity_id: IdentityId,
    pub initial_balance: u64,
    pub balance: u64,
    /// Oldest first. Never rewritten.
    pub history: Vec<HistoryEntry>,
    pub last_decay_at: Timestamp,
}

impl ReputationAccount {
    pub fn new(identity_id: IdentityId, initial_balance: u64, now: Timestamp) -> Self {
        Self {
            identity_id,
            initial_balance,
            balance: initial_balance,
            history: Vec::new(),
            last_decay_at: now,
        }
    }

    /// Balance implied by replaying the history over the initial balance.
    ///
    /// Every debit is clamped to what was available, so this always
    /// equals `balance`.
    pub fn replayed_balance(&self) -> u64 {
        self.history
            .iter()
            .fold(self.initial_balance, |bal, entry| match entry.kind {
                EntryKind::Gain => bal.saturating_add(entry.amount),
                EntryKind::Loss | EntryKind::Decay => bal.saturating_sub(entry.amount),
            })
    }

    pub(crate) fn append(&mut self, amount: u64, reason: Reason, kind: EntryKind, at: Timestamp) {
        match kind {
            EntryKind::Gain => self.balance = self.balance.saturating_add(amount),
            EntryKind::Loss | EntryKind::Decay => self.balance = self.balance.saturating_sub(amount),
        }
        self.history.push(HistoryEntry {
            amount,
            reason,
            kind,
            timestamp: at,
        });
    }
}
