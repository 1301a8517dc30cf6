//! The claim store: every known claim, keyed by id, written through to
//! the record store on each mutation.

use crate::{ClaimError, FeedFilter};
use rumorality_crypto::{claim_id, tombstone_digest, vote_id};
use rumorality_ledger::Participant;
use rumorality_store::{get_all_records, put_record, Collection, RecordStore};
use rumorality_types::{
    Claim, ClaimId, Clock, Direction, IdentityId, Outcome, RumorParams, Tally, Vote, VoterEntry,
    MILLIS_PER_HOUR,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Trust score reported while too few voters have weighed in.
pub const NEUTRAL_TRUST: f64 = 0.5;
/// Voters needed before the trust score leaves neutral.
pub const TRUST_MIN_VOTERS: usize = 3;

pub struct ClaimStore {
    claims: HashMap<ClaimId, Claim>,
    params: RumorParams,
    clock: Arc<dyn Clock>,
    store: Arc<dyn RecordStore>,
}

impl ClaimStore {
    pub fn new(params: RumorParams, clock: Arc<dyn Clock>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            claims: HashMap::new(),
            params,
            clock,
            store,
        }
    }

    /// Rebuild the in-memory index from the claims collection.
    pub fn load(
        params: RumorParams,
        clock: Arc<dyn Clock>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, ClaimError> {
        let mut this = Self::new(params, clock, store);
        for claim in get_all_records::<Claim>(this.store.as_ref(), Collection::Claims)? {
            this.claims.insert(claim.id, claim);
        }
        tracing::debug!(count = this.claims.len(), "loaded claims");
        Ok(this)
    }

    /// Post a claim backed by `stake` from `author`'s balance.
    ///
    /// The author automatically votes TRUE with the same stake, so the new
    /// claim's tally already holds one voter. The returned vote belongs in
    /// the voting engine's index.
    pub fn create_claim(
        &mut self,
        content: &str,
        author: &mut Participant,
        stake: u64,
        duration_hours: Option<u64>,
    ) -> Result<(Claim, Vote), ClaimError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClaimError::EmptyContent);
        }
        let len = content.chars().count();
        if len > self.params.max_claim_length {
            return Err(ClaimError::ContentTooLong {
                len,
                max: self.params.max_claim_length,
            });
        }
        if stake < self.params.min_post_stake {
            return Err(ClaimError::StakeBelowMinimum {
                stake,
                min: self.params.min_post_stake,
            });
        }
        if !author.ledger.can_afford(stake) {
            return Err(ClaimError::InsufficientStake {
                needed: stake,
                available: author.ledger.balance(),
            });
        }

        let now = self.clock.now();
        let hours = duration_hours.unwrap_or(self.params.default_claim_duration_hours);
        let author_id = author.id().clone();
        let id = claim_id(content, &author_id, now, stake);

        let snapshot = author.ledger.balance();
        let weight = author.ledger.vote_weight(stake);
        let vote = Vote {
            id: vote_id(
                &id,
                &author_id,
                Direction::True,
                stake,
                weight,
                snapshot,
                now,
                author.identity.device_attestation(),
                author.identity.network_attestation(),
            ),
            claim_id: id,
            voter_id: author_id.clone(),
            direction: Direction::True,
            stake,
            weight,
            reputation_snapshot: snapshot,
            timestamp: now,
            device_attestation: author.identity.device_attestation().to_string(),
            network_attestation: author.identity.network_attestation().map(str::to_string),
            signature: author.identity.sign_vote(&id, Direction::True, stake, now),
            public_key: author.identity.public_key(),
        };

        let mut tally = Tally::default();
        tally.record(
            Direction::True,
            VoterEntry {
                voter_id: author_id.clone(),
                weight,
                stake,
                reputation_snapshot: snapshot,
            },
        );
        let claim = Claim {
            id,
            content: content.to_string(),
            author_id: author_id.clone(),
            created_at: now,
            expires_at: now.plus_millis(hours.saturating_mul(MILLIS_PER_HOUR)),
            stake,
            signature: author.identity.sign_claim(content, now, stake),
            public_key: author.identity.public_key(),
            tally,
            sealed: false,
            sealed_at: None,
            outcome: None,
            deleted: false,
            deleted_at: None,
        };

        let checkpoint = author.ledger.account().clone();
        author.ledger.stake(stake, Some(id))?;
        if let Err(e) = author.persist(self.store.as_ref()) {
            author.ledger.restore(checkpoint);
            return Err(e.into());
        }
        if let Err(e) = self.write_new_claim(&claim, &vote) {
            author.roll_back(checkpoint, self.store.as_ref());
            return Err(e);
        }
        self.claims.insert(id, claim.clone());

        tracing::info!(claim = %id.short(), author = %author_id, stake, "claim posted");
        Ok((claim, vote))
    }

    /// Tombstone a claim. Only its author may do this; id, tally, and seal
    /// state are untouched. Deleting twice keeps the first tombstone.
    pub fn delete_claim(
        &mut self,
        id: &ClaimId,
        requester: &IdentityId,
    ) -> Result<Claim, ClaimError> {
        let now = self.clock.now();
        let mut claim = self.claims.get(id).ok_or(ClaimError::NotFound(*id))?.clone();
        if &claim.author_id != requester {
            return Err(ClaimError::Unauthorized {
                claim: *id,
                requester: requester.clone(),
            });
        }
        if claim.deleted {
            return Ok(claim);
        }
        claim.content = tombstone_digest(&claim.content);
        claim.deleted = true;
        claim.deleted_at = Some(now);
        self.put(claim.clone())?;
        tracing::info!(claim = %id.short(), "claim tombstoned");
        Ok(claim)
    }

    pub fn get_claim(&self, id: &ClaimId) -> Option<&Claim> {
        self.claims.get(id)
    }

    pub fn contains(&self, id: &ClaimId) -> bool {
        self.claims.contains_key(id)
    }

    /// Every claim, newest first.
    pub fn get_all(&self) -> Vec<&Claim> {
        let mut all: Vec<&Claim> = self.claims.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        all
    }

    pub fn get_feed(&self, filter: FeedFilter) -> Vec<&Claim> {
        let all = self.get_all();
        match filter {
            FeedFilter::All => all,
            FeedFilter::Trending => {
                let mut open: Vec<&Claim> = all.into_iter().filter(|c| c.is_open()).collect();
                open.sort_by(|a, b| b.tally.total_stake().cmp(&a.tally.total_stake()));
                open
            }
            FeedFilter::Sealed => {
                let mut sealed: Vec<&Claim> = all.into_iter().filter(|c| c.sealed).collect();
                sealed.sort_by(|a, b| b.sealed_at.cmp(&a.sealed_at));
                sealed
            }
        }
    }

    pub fn ids(&self) -> Vec<ClaimId> {
        self.claims.keys().copied().collect()
    }

    pub fn open_ids(&self) -> Vec<ClaimId> {
        self.claims
            .values()
            .filter(|c| c.is_open())
            .map(|c| c.id)
            .collect()
    }

    /// Distinct authors of every known claim.
    pub fn authors(&self) -> BTreeSet<IdentityId> {
        self.claims.values().map(|c| c.author_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Append a voter to one side of an open claim's tally.
    pub fn record_vote_tally(
        &mut self,
        claim_id: &ClaimId,
        direction: Direction,
        weight: f64,
        stake: u64,
        voter_id: &IdentityId,
        reputation_snapshot: u64,
    ) -> Result<(), ClaimError> {
        let mut claim = self
            .claims
            .get(claim_id)
            .ok_or(ClaimError::NotFound(*claim_id))?
            .clone();
        if claim.sealed {
            return Err(ClaimError::Sealed(*claim_id));
        }
        claim.tally.record(
            direction,
            VoterEntry {
                voter_id: voter_id.clone(),
                weight,
                stake,
                reputation_snapshot,
            },
        );
        self.put(claim)
    }

    /// Put back a tally captured before a vote whose later writes failed.
    ///
    /// Memory is always restored; the record is rewritten best effort.
    pub fn restore_tally(&mut self, claim_id: &ClaimId, tally: Tally) {
        let Some(claim) = self.claims.get_mut(claim_id) else {
            return;
        };
        claim.tally = tally;
        let claim = claim.clone();
        if let Err(e) = self.persist(&claim) {
            tracing::warn!(claim = %claim_id.short(), error = %e, "claim record left ahead of memory");
        }
    }

    /// Seal a claim with `outcome`. Returns `false` (and changes nothing)
    /// when the claim was already sealed.
    pub fn seal_claim(&mut self, claim_id: &ClaimId, outcome: Outcome) -> Result<bool, ClaimError> {
        let now = self.clock.now();
        let mut claim = self
            .claims
            .get(claim_id)
            .ok_or(ClaimError::NotFound(*claim_id))?
            .clone();
        if claim.sealed {
            return Ok(false);
        }
        claim.sealed = true;
        claim.sealed_at = Some(now);
        claim.outcome = Some(outcome);
        self.put(claim)?;
        tracing::info!(claim = %claim_id.short(), %outcome, "claim sealed");
        Ok(true)
    }

    /// Store a validated claim received from a peer.
    ///
    /// The claim enters open, untombstoned, with an empty tally; its tally
    /// is rebuilt from the votes that merge locally. Returns `false` when
    /// the id is already known.
    pub fn merge_remote(&mut self, mut claim: Claim) -> Result<bool, ClaimError> {
        if self.claims.contains_key(&claim.id) {
            return Ok(false);
        }
        claim.tally = Tally::default();
        claim.sealed = false;
        claim.sealed_at = None;
        claim.outcome = None;
        claim.deleted = false;
        claim.deleted_at = None;
        tracing::debug!(claim = %claim.id.short(), author = %claim.author_id, "merged remote claim");
        self.put(claim)?;
        Ok(true)
    }

    /// `trueWeight / totalWeight`, or neutral with fewer than three voters.
    pub fn trust_score(&self, claim_id: &ClaimId) -> Option<f64> {
        let claim = self.claims.get(claim_id)?;
        let total = claim.tally.total_weight();
        if claim.tally.voter_count() < TRUST_MIN_VOTERS || total <= 0.0 {
            return Some(NEUTRAL_TRUST);
        }
        Some(claim.tally.true_side.weight / total)
    }

    /// Trust score as a whole percentage.
    pub fn trust_percentage(&self, claim_id: &ClaimId) -> Option<u8> {
        self.trust_score(claim_id)
            .map(|score| (score * 100.0).round().clamp(0.0, 100.0) as u8)
    }

    /// Write the author's vote, then the claim. A failed claim write takes
    /// the vote record back out so a reload never sees one without the other.
    fn write_new_claim(&self, claim: &Claim, vote: &Vote) -> Result<(), ClaimError> {
        put_record(self.store.as_ref(), Collection::Votes, &vote.id.to_hex(), vote)?;
        if let Err(e) = self.persist(claim) {
            if let Err(undo) = self.store.delete(Collection::Votes, &vote.id.to_hex()) {
                tracing::warn!(vote = %vote.id.short(), error = %undo, "orphaned author vote record");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Persist, then replace the in-memory copy.
    fn put(&mut self, claim: Claim) -> Result<(), ClaimError> {
        self.persist(&claim)?;
        self.claims.insert(claim.id, claim);
        Ok(())
    }

    fn persist(&self, claim: &Claim) -> Result<(), ClaimError> {
        put_record(self.store.as_ref(), Collection::Claims, &claim.id.to_hex(), claim)?;
        Ok(())
    }
}
