//! Checks applied to every claim and vote received from a peer before it
//! is merged, whether it arrived in a sync response or as a push.

use rumorality_claims::ClaimStore;
use rumorality_crypto::{
    claim_id, claim_signing_payload, derive_identity_id, verify_signature, vote_id,
    vote_signing_payload,
};
use rumorality_ledger::{vote_weight, votes_for_cost};
use rumorality_types::{Claim, ErrorKind, RumorParams, Timestamp, Vote};
use rumorality_voting::VotingEngine;
use thiserror::Error;

/// Relative tolerance when recomputing a vote's weight.
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Why an inbound record was refused.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InboundRejection {
    #[error("signature does not verify against the embedded public key")]
    BadSignature,

    #[error("id does not match the record contents")]
    IdMismatch,

    #[error("identity id is not derived from the embedded public key")]
    ForgedIdentity,

    #[error("already known")]
    Duplicate,

    #[error("timestamp lies {0}ms in the future")]
    FromFuture(u64),

    #[error("claim is {age_ms}ms old, limit {max_ms}ms")]
    TooOld { age_ms: u64, max_ms: u64 },

    #[error("weight {got} does not match {expected} for the stake and reputation snapshot")]
    BadWeight { got: f64, expected: f64 },

    #[error("stake {0} is not the price of any vote count")]
    BadStake(u64),

    #[error("vote references an unknown claim")]
    UnknownClaim,

    #[error("sender header does not match the connected peer")]
    SenderMismatch,

    /// The record was well formed but the local merge refused it.
    #[error("merge refused: {0}")]
    Refused(String),
}

impl InboundRejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadSignature => ErrorKind::Crypto,
            Self::Duplicate | Self::UnknownClaim | Self::Refused(_) => ErrorKind::State,
            _ => ErrorKind::Validation,
        }
    }

    /// Duplicates are expected in anti-entropy and are not worth a warning.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Validate a peer-supplied claim against local state.
pub fn validate_claim(
    claim: &Claim,
    claims: &ClaimStore,
    now: Timestamp,
    params: &RumorParams,
) -> Result<(), InboundRejection> {
    if claims.contains(&claim.id) {
        return Err(InboundRejection::Duplicate);
    }
    let payload = claim_signing_payload(&claim.content, claim.created_at, claim.stake);
    if !verify_signature(&payload, &claim.signature, &claim.public_key) {
        return Err(InboundRejection::BadSignature);
    }
    if derive_identity_id(&claim.public_key) != claim.author_id {
        return Err(InboundRejection::ForgedIdentity);
    }
    if claim_id(&claim.content, &claim.author_id, claim.created_at, claim.stake) != claim.id {
        return Err(InboundRejection::IdMismatch);
    }
    let age = claim.created_at.age_at(now);
    if age < 0 {
        return Err(InboundRejection::FromFuture(age.unsigned_abs() as u64));
    }
    let age_ms = age as u64;
    if age_ms > params.max_claim_age_ms {
        return Err(InboundRejection::TooOld {
            age_ms,
            max_ms: params.max_claim_age_ms,
        });
    }
    Ok(())
}

/// Validate a peer-supplied vote. The (claim, voter) and device
/// uniqueness rules are enforced again by the merge itself.
///
/// The signature does not cover the weight, so the weight is recomputed
/// from the signed stake and the carried reputation snapshot.
pub fn validate_vote(
    vote: &Vote,
    claims: &ClaimStore,
    votes: &VotingEngine,
    params: &RumorParams,
) -> Result<(), InboundRejection> {
    if votes.contains(&vote.id) {
        return Err(InboundRejection::Duplicate);
    }
    let payload = vote_signing_payload(&vote.claim_id, vote.direction, vote.stake, vote.timestamp);
    if !verify_signature(&payload, &vote.signature, &vote.public_key) {
        return Err(InboundRejection::BadSignature);
    }
    if derive_identity_id(&vote.public_key) != vote.voter_id {
        return Err(InboundRejection::ForgedIdentity);
    }
    let expected = vote_id(
        &vote.claim_id,
        &vote.voter_id,
        vote.direction,
        vote.stake,
        vote.weight,
        vote.reputation_snapshot,
        vote.timestamp,
        &vote.device_attestation,
        vote.network_attestation.as_deref(),
    );
    if expected != vote.id {
        return Err(InboundRejection::IdMismatch);
    }
    check_weight(vote)?;
    let claim = claims
        .get_claim(&vote.claim_id)
        .ok_or(InboundRejection::UnknownClaim)?;
    // The author's automatic vote carries the post stake, not a vote price.
    let author_vote = vote.voter_id == claim.author_id && vote.stake == claim.stake;
    if !author_vote && votes_for_cost(vote.stake, params.quadratic_voting).is_none() {
        return Err(InboundRejection::BadStake(vote.stake));
    }
    Ok(())
}

fn check_weight(vote: &Vote) -> Result<(), InboundRejection> {
    let expected = vote_weight(vote.stake, vote.reputation_snapshot);
    let got = vote.weight;
    if !got.is_finite() || got < 0.0 || (got - expected).abs() > WEIGHT_TOLERANCE * expected.max(1.0) {
        return Err(InboundRejection::BadWeight { got, expected });
    }
    Ok(())
}
