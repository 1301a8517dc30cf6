//! Settlement: who gets what when a claim seals.
//!
//! - Tie: every voter's stake comes back unchanged.
//! - True/false: winners get their stake back plus a share of the losers'
//!   pool proportional to their own stake, floored. Losers forfeit the
//!   stake they already paid.
//!
//! Each node applies only the entries that belong to its own participant.

use crate::ConsensusError;
use rumorality_claims::ClaimStore;
use rumorality_ledger::{Participant, Reason};
use rumorality_store::RecordStore;
use rumorality_types::{ClaimId, Direction, IdentityId, Outcome, Vote, VoteId};
use rumorality_voting::VotingEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutKind {
    /// Winning side: stake plus pool share.
    Winner,
    /// Tie: stake returned.
    Refund,
    /// Losing side: nothing returned.
    Forfeit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub vote_id: VoteId,
    pub voter_id: IdentityId,
    pub stake: u64,
    pub amount: u64,
    pub kind: PayoutKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub claim_id: ClaimId,
    pub outcome: Outcome,
    pub winner_pool: u64,
    pub loser_pool: u64,
    pub payouts: Vec<Payout>,
    /// Total credited to the local participant, including any author refund.
    pub local_credit: u64,
}

impl Settlement {
    /// Sum paid to winners (or refunded on a tie).
    pub fn total_paid(&self) -> u64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// Payouts for every vote on a sealed claim. Pure; touches no ledger.
pub fn compute_settlement(claim_id: ClaimId, outcome: Outcome, votes: &[&Vote]) -> Settlement {
    let Some(winning) = outcome.winning_direction() else {
        let payouts: Vec<Payout> = votes
            .iter()
            .map(|v| payout(v, v.stake, PayoutKind::Refund))
            .collect();
        let pool = payouts.iter().map(|p| p.stake).sum();
        return Settlement {
            claim_id,
            outcome,
            winner_pool: pool,
            loser_pool: 0,
            payouts,
            local_credit: 0,
        };
    };

    let pool_of = |dir: Direction| -> u64 {
        votes
            .iter()
            .filter(|v| v.direction == dir)
            .map(|v| v.stake)
            .sum()
    };
    let winner_pool = pool_of(winning);
    let loser_pool = votes.iter().map(|v| v.stake).sum::<u64>() - winner_pool;

    let payouts = votes
        .iter()
        .map(|v| {
            if v.direction == winning {
                let bonus = if winner_pool == 0 {
                    0
                } else {
                    (v.stake as u128 * loser_pool as u128 / winner_pool as u128) as u64
                };
                payout(v, v.stake.saturating_add(bonus), PayoutKind::Winner)
            } else {
                payout(v, 0, PayoutKind::Forfeit)
            }
        })
        .collect();

    Settlement {
        claim_id,
        outcome,
        winner_pool,
        loser_pool,
        payouts,
        local_credit: 0,
    }
}

fn payout(vote: &Vote, amount: u64, kind: PayoutKind) -> Payout {
    Payout {
        vote_id: vote.id,
        voter_id: vote.voter_id.clone(),
        stake: vote.stake,
        amount,
        kind,
    }
}

/// Applies a claim's settlement to the local participant.
pub struct SettlementEngine {
    store: Arc<dyn RecordStore>,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn distribute(
        &self,
        claims: &ClaimStore,
        voting: &VotingEngine,
        local: &mut Participant,
        claim_id: &ClaimId,
        outcome: Outcome,
    ) -> Result<Settlement, ConsensusError> {
        let claim = claims
            .get_claim(claim_id)
            .ok_or(ConsensusError::NotFound(*claim_id))?;
        let votes = voting.votes_for_claim(claim_id);
        let mut settlement = compute_settlement(*claim_id, outcome, &votes);

        let local_id = local.id().clone();
        let mut credited = 0u64;
        for p in settlement.payouts.iter().filter(|p| p.voter_id == local_id) {
            match p.kind {
                PayoutKind::Winner => {
                    local.ledger.reward(p.amount, Reason::VoteWon { claim: *claim_id });
                    credited += p.amount;
                }
                PayoutKind::Refund => {
                    local.ledger.reward(p.amount, Reason::TieRefund { claim: *claim_id });
                    credited += p.amount;
                }
                PayoutKind::Forfeit => {
                    local.ledger.record_loss(*claim_id);
                    tracing::info!(claim = %claim_id.short(), stake = p.stake, "stake forfeited");
                }
            }
        }
        if outcome == Outcome::True && claim.author_id == local_id {
            local
                .ledger
                .reward(claim.stake, Reason::ClaimVerified { claim: *claim_id });
            credited += claim.stake;
        }
        local.persist(self.store.as_ref())?;

        settlement.local_credit = credited;
        tracing::info!(
            claim = %claim_id.short(),
            %outcome,
            winner_pool = settlement.winner_pool,
            loser_pool = settlement.loser_pool,
            credited,
            "settlement applied"
        );
        Ok(settlement)
    }
}
