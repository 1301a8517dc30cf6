//! The voting engine.

use crate::VotingError;
use rumorality_claims::ClaimStore;
use rumorality_crypto::vote_id;
use rumorality_ledger::{vote_cost, Participant};
use rumorality_store::{get_all_records, put_record, Collection, RecordStore};
use rumorality_types::{ClaimId, Clock, Direction, IdentityId, RumorParams, Vote, VoteId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct VotingEngine {
    votes: HashMap<VoteId, Vote>,
    /// Accepted vote ids per claim, in acceptance order.
    by_claim: HashMap<ClaimId, Vec<VoteId>>,
    voters: HashSet<(ClaimId, IdentityId)>,
    devices: HashSet<(ClaimId, String)>,
    params: RumorParams,
    clock: Arc<dyn Clock>,
    store: Arc<dyn RecordStore>,
}

impl VotingEngine {
    pub fn new(params: RumorParams, clock: Arc<dyn Clock>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            votes: HashMap::new(),
            by_claim: HashMap::new(),
            voters: HashSet::new(),
            devices: HashSet::new(),
            params,
            clock,
            store,
        }
    }

    pub fn load(
        params: RumorParams,
        clock: Arc<dyn Clock>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, VotingError> {
        let mut this = Self::new(params, clock, store);
        let mut votes = get_all_records::<Vote>(this.store.as_ref(), Collection::Votes)?;
        votes.sort_by_key(|v| v.timestamp);
        for vote in votes {
            this.index(vote);
        }
        tracing::debug!(count = this.votes.len(), "loaded votes");
        Ok(this)
    }

    /// Cast `requested` votes in `direction` on a claim.
    ///
    /// Checks run in a fixed order and the first failure wins: direction,
    /// duplicate voter, claim exists, claim open, new-account cooldown,
    /// device binding, then price.
    pub fn cast_vote(
        &mut self,
        claims: &mut ClaimStore,
        voter: &mut Participant,
        claim_id: &ClaimId,
        direction: &str,
        requested: u64,
    ) -> Result<Vote, VotingError> {
        let direction: Direction = direction.parse()?;
        let voter_id = voter.id().clone();
        if self.has_voted(claim_id, &voter_id) {
            return Err(VotingError::AlreadyVoted {
                claim: *claim_id,
                voter: voter_id,
            });
        }
        let claim = claims
            .get_claim(claim_id)
            .ok_or(VotingError::NotFound(*claim_id))?;
        if claim.sealed {
            return Err(VotingError::Sealed(*claim_id));
        }
        let prior_tally = claim.tally.clone();
        if self.params.cooldown_enabled
            && voter.identity.is_new_account()
            && claim.tally.total_stake() > self.params.trending_stake_threshold
        {
            tracing::warn!(claim = %claim_id.short(), voter = %voter_id, "new account cooldown");
            return Err(VotingError::NewAccountCooldown(*claim_id));
        }
        let device = voter.identity.device_attestation().to_string();
        if self.params.device_binding_enabled && self.devices.contains(&(*claim_id, device.clone())) {
            tracing::warn!(claim = %claim_id.short(), voter = %voter_id, "device already voted");
            return Err(VotingError::DeviceAlreadyVoted(*claim_id));
        }
        if requested == 0 {
            return Err(VotingError::InvalidVoteCount);
        }
        let cost = voter.ledger.vote_cost(requested);
        if !voter.ledger.can_afford(cost) {
            return Err(VotingError::InsufficientBalance {
                needed: cost,
                available: voter.ledger.balance(),
            });
        }

        let weight = voter.ledger.vote_weight(cost);
        let snapshot = voter.ledger.balance();
        let now = self.clock.now();
        let network = voter.identity.network_attestation().map(str::to_string);
        let vote = Vote {
            id: vote_id(
                claim_id,
                &voter_id,
                direction,
                cost,
                weight,
                snapshot,
                now,
                &device,
                network.as_deref(),
            ),
            claim_id: *claim_id,
            voter_id: voter_id.clone(),
            direction,
            stake: cost,
            weight,
            reputation_snapshot: snapshot,
            timestamp: now,
            device_attestation: device,
            network_attestation: network,
            signature: voter.identity.sign_vote(claim_id, direction, cost, now),
            public_key: voter.identity.public_key(),
        };

        // Account, then tally, then vote record. Each failure undoes the
        // steps before it, so memory never holds half a vote.
        let checkpoint = voter.ledger.account().clone();
        voter.ledger.stake(cost, Some(*claim_id))?;
        if let Err(e) = voter.persist(self.store.as_ref()) {
            voter.ledger.restore(checkpoint);
            return Err(e.into());
        }
        if let Err(e) = claims.record_vote_tally(claim_id, direction, weight, cost, &voter_id, snapshot) {
            voter.roll_back(checkpoint, self.store.as_ref());
            return Err(e.into());
        }
        if let Err(e) = self.persist(&vote) {
            claims.restore_tally(claim_id, prior_tally);
            voter.roll_back(checkpoint, self.store.as_ref());
            return Err(e);
        }
        self.index(vote.clone());

        tracing::info!(
            claim = %claim_id.short(),
            voter = %voter_id,
            %direction,
            stake = cost,
            weight,
            "vote cast"
        );
        Ok(vote)
    }

    /// Index the author's automatic vote returned by claim creation. Claim
    /// creation already wrote its record.
    pub fn record_author_vote(&mut self, vote: Vote) -> Result<(), VotingError> {
        if self.votes.contains_key(&vote.id) {
            return Err(VotingError::DuplicateVote(vote.id));
        }
        self.index(vote);
        Ok(())
    }

    /// Merge a validated vote received from a peer.
    ///
    /// The voter and device uniqueness rules are re-checked here no matter
    /// what the originating node decided. The local ledger is never touched.
    pub fn merge_remote_vote(
        &mut self,
        claims: &mut ClaimStore,
        vote: Vote,
    ) -> Result<(), VotingError> {
        if self.votes.contains_key(&vote.id) {
            return Err(VotingError::DuplicateVote(vote.id));
        }
        let claim = claims
            .get_claim(&vote.claim_id)
            .ok_or(VotingError::NotFound(vote.claim_id))?;
        if claim.sealed {
            return Err(VotingError::Sealed(vote.claim_id));
        }
        if self.has_voted(&vote.claim_id, &vote.voter_id) {
            return Err(VotingError::AlreadyVoted {
                claim: vote.claim_id,
                voter: vote.voter_id,
            });
        }
        if self.params.device_binding_enabled
            && self
                .devices
                .contains(&(vote.claim_id, vote.device_attestation.clone()))
        {
            return Err(VotingError::DeviceAlreadyVoted(vote.claim_id));
        }

        let prior_tally = claim.tally.clone();
        claims.record_vote_tally(
            &vote.claim_id,
            vote.direction,
            vote.weight,
            vote.stake,
            &vote.voter_id,
            vote.reputation_snapshot,
        )?;
        if let Err(e) = self.persist(&vote) {
            claims.restore_tally(&vote.claim_id, prior_tally);
            return Err(e);
        }
        tracing::debug!(
            claim = %vote.claim_id.short(),
            voter = %vote.voter_id,
            "merged remote vote"
        );
        self.index(vote);
        Ok(())
    }

    pub fn has_voted(&self, claim_id: &ClaimId, voter_id: &IdentityId) -> bool {
        self.voters.contains(&(*claim_id, voter_id.clone()))
    }

    pub fn user_vote(&self, claim_id: &ClaimId, voter_id: &IdentityId) -> Option<&Vote> {
        self.votes_for_claim(claim_id)
            .into_iter()
            .find(|v| &v.voter_id == voter_id)
    }

    /// Accepted votes on a claim, in acceptance order.
    pub fn votes_for_claim(&self, claim_id: &ClaimId) -> Vec<&Vote> {
        self.by_claim
            .get(claim_id)
            .map(|ids| ids.iter().filter_map(|id| self.votes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_vote(&self, id: &VoteId) -> Option<&Vote> {
        self.votes.get(id)
    }

    pub fn contains(&self, id: &VoteId) -> bool {
        self.votes.contains_key(id)
    }

    pub fn ids(&self) -> Vec<VoteId> {
        self.votes.keys().copied().collect()
    }

    pub fn all_votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Price preview for `requested` votes under the configured mode.
    pub fn vote_cost(&self, requested: u64) -> u64 {
        vote_cost(requested, self.params.quadratic_voting)
    }

    fn index(&mut self, vote: Vote) {
        self.voters.insert((vote.claim_id, vote.voter_id.clone()));
        self.devices
            .insert((vote.claim_id, vote.device_attestation.clone()));
        self.by_claim.entry(vote.claim_id).or_default().push(vote.id);
        self.votes.insert(vote.id, vote);
    }

    fn persist(&self, vote: &Vote) -> Result<(), VotingError> {
        put_record(self.store.as_ref(), Collection::Votes, &vote.id.to_hex(), vote)?;
        Ok(())
    }
}
