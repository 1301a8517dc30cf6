//! The sealing state machine and its periodic pass.

use crate::settlement::{Settlement, SettlementEngine};
use crate::ConsensusError;
use rumorality_claims::ClaimStore;
use rumorality_ledger::Participant;
use rumorality_types::{Claim, ClaimId, Clock, Outcome, RumorParams, Tally, Timestamp};
use rumorality_voting::VotingEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What caused a claim to seal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealTrigger {
    Timeout,
    Supermajority,
    Forced,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealReport {
    pub claim_id: ClaimId,
    pub outcome: Outcome,
    pub trigger: SealTrigger,
    pub settlement: Settlement,
}

/// Heavier side wins; equal weight is a tie.
pub fn resolve_by_weight(tally: &Tally) -> Outcome {
    let (t, f) = (tally.true_side.weight, tally.false_side.weight);
    if t > f {
        Outcome::True
    } else if f > t {
        Outcome::False
    } else {
        Outcome::Tie
    }
}

/// Whether an open claim should seal now, and how.
///
/// Sealed claims never re-evaluate. Timeout is checked first; otherwise a
/// side holding at least the supermajority share of a non-zero total
/// weight seals the claim early.
pub fn evaluate(claim: &Claim, now: Timestamp, params: &RumorParams) -> Option<(Outcome, SealTrigger)> {
    if claim.sealed {
        return None;
    }
    if claim.created_at.has_expired(params.sealing_window_ms, now) {
        return Some((resolve_by_weight(&claim.tally), SealTrigger::Timeout));
    }
    let total = claim.tally.total_weight();
    if total <= 0.0 {
        return None;
    }
    if claim.tally.true_side.weight / total >= params.supermajority_threshold {
        Some((Outcome::True, SealTrigger::Supermajority))
    } else if claim.tally.false_side.weight / total >= params.supermajority_threshold {
        Some((Outcome::False, SealTrigger::Supermajority))
    } else {
        None
    }
}

pub struct ConsensusSealer {
    params: RumorParams,
    clock: Arc<dyn Clock>,
    settlement: SettlementEngine,
}

impl ConsensusSealer {
    pub fn new(params: RumorParams, clock: Arc<dyn Clock>, settlement: SettlementEngine) -> Self {
        Self {
            params,
            clock,
            settlement,
        }
    }

    /// Evaluate every open claim and seal the ones whose trigger fired.
    ///
    /// A failure on one claim is logged and does not stop the pass.
    pub fn scan(
        &self,
        claims: &mut ClaimStore,
        voting: &VotingEngine,
        local: &mut Participant,
    ) -> Vec<SealReport> {
        let mut reports = Vec::new();
        for id in claims.open_ids() {
            match self.check_claim(claims, voting, local, &id) {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(claim = %id.short(), error = %e, "seal check failed");
                }
            }
        }
        if !reports.is_empty() {
            tracing::debug!(sealed = reports.len(), "seal pass complete");
        }
        reports
    }

    /// Evaluate one claim; seal and settle it if a trigger fired.
    pub fn check_claim(
        &self,
        claims: &mut ClaimStore,
        voting: &VotingEngine,
        local: &mut Participant,
        claim_id: &ClaimId,
    ) -> Result<Option<SealReport>, ConsensusError> {
        let claim = claims
            .get_claim(claim_id)
            .ok_or(ConsensusError::NotFound(*claim_id))?;
        let Some((outcome, trigger)) = evaluate(claim, self.clock.now(), &self.params) else {
            return Ok(None);
        };
        self.seal(claims, voting, local, claim_id, outcome, trigger)
    }

    /// Seal immediately by weight, regardless of the window. Returns
    /// `None` when the claim was already sealed.
    pub fn force_seal(
        &self,
        claims: &mut ClaimStore,
        voting: &VotingEngine,
        local: &mut Participant,
        claim_id: &ClaimId,
    ) -> Result<Option<SealReport>, ConsensusError> {
        let claim = claims
            .get_claim(claim_id)
            .ok_or(ConsensusError::NotFound(*claim_id))?;
        if claim.sealed {
            return Ok(None);
        }
        let outcome = resolve_by_weight(&claim.tally);
        self.seal(claims, voting, local, claim_id, outcome, SealTrigger::Forced)
    }

    fn seal(
        &self,
        claims: &mut ClaimStore,
        voting: &VotingEngine,
        local: &mut Participant,
        claim_id: &ClaimId,
        outcome: Outcome,
        trigger: SealTrigger,
    ) -> Result<Option<SealReport>, ConsensusError> {
        if !claims.seal_claim(claim_id, outcome)? {
            return Ok(None);
        }
        tracing::info!(claim = %claim_id.short(), %outcome, ?trigger, "sealing claim");
        let settlement = self
            .settlement
            .distribute(claims, voting, local, claim_id, outcome)?;
        Ok(Some(SealReport {
            claim_id: *claim_id,
            outcome,
            trigger,
            settlement,
        }))
    }
}
