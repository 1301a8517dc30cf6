//! Claims, their weighted tallies, and the seal outcome.

use crate::hash::ClaimId;
use crate::identity::IdentityId;
use crate::keys::{PublicKey, Signature};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which side of a claim a vote backs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    True,
    False,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid direction {0:?}: expected \"true\" or \"false\"")]
pub struct ParseDirectionError(pub String);

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
        }
    }

    /// Single-byte encoding used inside signing payloads.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::True => 1,
            Self::False => 0,
        }
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

impl From<bool> for Direction {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved truth value of a sealed claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    True,
    False,
    Tie,
}

impl Outcome {
    /// The direction that wins under this outcome; `None` for a tie.
    pub fn winning_direction(&self) -> Option<Direction> {
        match self {
            Self::True => Some(Direction::True),
            Self::False => Some(Direction::False),
            Self::Tie => None,
        }
    }
}

impl From<Direction> for Outcome {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::True => Self::True,
            Direction::False => Self::False,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "true",
            Self::False => "false",
            Self::Tie => "tie",
        };
        f.write_str(s)
    }
}

/// One voter's contribution to a tally side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoterEntry {
    pub voter_id: IdentityId,
    pub weight: f64,
    pub stake: u64,
    pub reputation_snapshot: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TallySide {
    pub weight: f64,
    pub stake: u64,
    pub voters: Vec<VoterEntry>,
}

impl TallySide {
    fn push(&mut self, entry: VoterEntry) {
        self.weight += entry.weight;
        self.stake = self.stake.saturating_add(entry.stake);
        self.voters.push(entry);
    }
}

/// Weighted vote tally of a claim, one side per direction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(rename = "true")]
    pub true_side: TallySide,
    #[serde(rename = "false")]
    pub false_side: TallySide,
}

impl Tally {
    pub fn side(&self, direction: Direction) -> &TallySide {
        match direction {
            Direction::True => &self.true_side,
            Direction::False => &self.false_side,
        }
    }

    pub fn side_mut(&mut self, direction: Direction) -> &mut TallySide {
        match direction {
            Direction::True => &mut self.true_side,
            Direction::False => &mut self.false_side,
        }
    }

    /// Append a voter to one side, accumulating weight and stake.
    pub fn record(&mut self, direction: Direction, entry: VoterEntry) {
        self.side_mut(direction).push(entry);
    }

    pub fn total_weight(&self) -> f64 {
        self.true_side.weight + self.false_side.weight
    }

    pub fn total_stake(&self) -> u64 {
        self.true_side.stake.saturating_add(self.false_side.stake)
    }

    pub fn voter_count(&self) -> usize {
        self.true_side.voters.len() + self.false_side.voters.len()
    }

    pub fn contains_voter(&self, voter: &IdentityId) -> bool {
        self.true_side
            .voters
            .iter()
            .chain(self.false_side.voters.iter())
            .any(|v| &v.voter_id == voter)
    }
}

/// Seal state of a claim. `Open` is the only non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimState {
    Open,
    Sealed(Outcome),
}

/// A staked content assertion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    /// The original text, or a tombstone digest once deleted.
    pub content: String,
    pub author_id: IdentityId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub stake: u64,
    /// Author signature over `(content, created_at, stake)`.
    pub signature: Signature,
    pub public_key: PublicKey,
    pub tally: Tally,
    pub sealed: bool,
    pub sealed_at: Option<Timestamp>,
    pub outcome: Option<Outcome>,
    pub deleted: bool,
    pub deleted_at: Option<Timestamp>,
}

impl Claim {
    pub fn state(&self) -> ClaimState {
        match (self.sealed, self.outcome) {
            (true, Some(outcome)) => ClaimState::Sealed(outcome),
            _ => ClaimState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(voter: &str, weight: f64, stake: u64) -> VoterEntry {
        VoterEntry {
            voter_id: IdentityId::from(voter),
            weight,
            stake,
            reputation_snapshot: 100,
        }
    }

    #[test]
    fn direction_parses_only_canonical_strings() {
        assert_eq!("true".parse::<Direction>(), Ok(Direction::True));
        assert_eq!("false".parse::<Direction>(), Ok(Direction::False));
        assert!("TRUE".parse::<Direction>().is_err());
        assert!("maybe".parse::<Direction>().is_err());
    }

    #[test]
    fn tally_accumulates_per_side() {
        let mut tally = Tally::default();
        tally.record(Direction::True, entry("aaaa", 3.0, 9));
        tally.record(Direction::False, entry("bbbb", 1.0, 1));
        tally.record(Direction::True, entry("cccc", 2.0, 4));

        assert_eq!(tally.true_side.weight, 5.0);
        assert_eq!(tally.true_side.stake, 13);
        assert_eq!(tally.total_weight(), 6.0);
        assert_eq!(tally.total_stake(), 14);
        assert_eq!(tally.voter_count(), 3);
        assert!(tally.contains_voter(&IdentityId::from("bbbb")));
        assert!(!tally.contains_voter(&IdentityId::from("dddd")));
    }

    #[test]
    fn tally_serializes_with_direction_keys() {
        let json = serde_json::to_value(Tally::default()).unwrap();
        assert!(json.get("true").is_some());
        assert!(json.get("false").is_some());
    }

    #[test]
    fn tie_has_no_winner() {
        assert_eq!(Outcome::Tie.winning_direction(), None);
        assert_eq!(Outcome::from(Direction::False).winning_direction(), Some(Direction::False));
    }
}
