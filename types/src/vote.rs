//! Accepted votes. A vote is immutable once created, including after replication.

use crate::claim::Direction;
use crate::hash::{ClaimId, VoteId};
use crate::identity::IdentityId;
use crate::keys::{PublicKey, Signature};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub claim_id: ClaimId,
    pub voter_id: IdentityId,
    pub direction: Direction,
    /// Reputation spent on this vote (the quadratic or linear cost).
    pub stake: u64,
    /// Tally contribution derived from stake and the voter's balance.
    pub weight: f64,
    /// Voter balance just before the stake was debited.
    pub reputation_snapshot: u64,
    pub timestamp: Timestamp,
    pub device_attestation: String,
    pub network_attestation: Option<String>,
    /// Voter signature over `(claim_id, direction, stake, timestamp)`.
    pub signature: Signature,
    pub public_key: PublicKey,
}
