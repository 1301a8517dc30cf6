//! Anti-entropy replication of claims and votes.
//!
//! On every newly opened session both sides send a `SyncRequest` listing
//! the ids they hold; the peer answers with only what is missing. Locally
//! created claims and votes are pushed to all open sessions as they
//! happen. Every inbound record passes [`validation`](crate::validation)
//! before it is merged, and a bad record never stops the rest of its
//! batch from merging.
//!
//! The protocol owns sessions and the transport handle but not the claim
//! or vote stores: callers pass those in under their own lock.

use crate::rendezvous::Rendezvous;
use crate::session::{SessionState, SessionTable};
use crate::transport::{Transport, TransportEvent};
use crate::validation::{validate_claim, validate_vote, InboundRejection};
use crate::NetworkError;
use rumorality_claims::ClaimStore;
use rumorality_messages::{
    sync_responses, Envelope, MessageType, ReplicationMessage, SYNC_CHUNK_BUDGET,
};
use rumorality_types::{Claim, ClaimId, Clock, IdentityId, RumorParams, Vote, VoteId};
use rumorality_voting::{VotingEngine, VotingError};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A record refused during a merge.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedRecord {
    /// Hex id of the refused claim or vote.
    pub record: String,
    pub reason: InboundRejection,
}

/// What one batch of inbound records did to local state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeReport {
    pub claims_merged: Vec<ClaimId>,
    pub votes_merged: Vec<VoteId>,
    pub duplicates: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl MergeReport {
    pub fn merged(&self) -> usize {
        self.claims_merged.len() + self.votes_merged.len()
    }

    fn reject(&mut self, record: String, reason: InboundRejection) {
        if reason.is_benign() {
            self.duplicates += 1;
        } else {
            self.rejected.push(RejectedRecord { record, reason });
        }
    }
}

/// The effect of handling one transport event.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicationOutcome {
    Opened,
    PeerConnected(IdentityId),
    PeerDisconnected(IdentityId),
    SyncAnswered {
        peer: IdentityId,
        claims: usize,
        votes: usize,
        /// `SyncResponse` messages the answer was split into.
        frames: usize,
    },
    Merged {
        peer: IdentityId,
        message: MessageType,
        report: MergeReport,
    },
    /// A whole message was dropped before its records were looked at.
    Dropped {
        peer: IdentityId,
        reason: InboundRejection,
    },
    TransportError {
        peer: Option<IdentityId>,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

pub struct ReplicationProtocol {
    local_id: IdentityId,
    transport: Arc<dyn Transport>,
    rendezvous: Option<Arc<dyn Rendezvous>>,
    sessions: SessionTable,
    params: RumorParams,
    clock: Arc<dyn Clock>,
    sync_budget: usize,
}

impl ReplicationProtocol {
    pub fn new(
        local_id: IdentityId,
        transport: Arc<dyn Transport>,
        rendezvous: Option<Arc<dyn Rendezvous>>,
        params: RumorParams,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            local_id,
            transport,
            rendezvous,
            sessions: SessionTable::new(),
            params,
            clock,
            sync_budget: SYNC_CHUNK_BUDGET,
        }
    }

    /// Cap on the record bytes carried by each `SyncResponse`.
    pub fn with_sync_budget(mut self, budget: usize) -> Self {
        self.sync_budget = budget;
        self
    }

    /// Open the transport and announce ourselves to the rendezvous.
    pub fn open(&mut self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, NetworkError> {
        let events = self.transport.open(&self.local_id)?;
        self.register();
        tracing::info!(node = %self.local_id, "replication started");
        Ok(events)
    }

    pub fn local_id(&self) -> &IdentityId {
        &self.local_id
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn open_peers(&self) -> Vec<IdentityId> {
        self.sessions.open_peers()
    }

    // ── Anti-entropy ────────────────────────────────────────────────────

    /// Everything we hold, as a request for what we lack.
    pub fn build_sync_request(claims: &ClaimStore, votes: &VotingEngine) -> ReplicationMessage {
        let mut known_claim_ids = claims.ids();
        known_claim_ids.sort();
        let mut known_vote_ids = votes.ids();
        known_vote_ids.sort();
        ReplicationMessage::SyncRequest {
            known_claim_ids,
            known_vote_ids,
        }
    }

    /// The claims and votes the requester lacks, claims oldest first and
    /// votes in timestamp order. Tombstoned claims and their votes are
    /// never offered.
    pub fn missing_records(
        claims: &ClaimStore,
        votes: &VotingEngine,
        known_claim_ids: &[ClaimId],
        known_vote_ids: &[VoteId],
    ) -> (Vec<Claim>, Vec<Vote>) {
        let known_claims: HashSet<&ClaimId> = known_claim_ids.iter().collect();
        let known_votes: HashSet<&VoteId> = known_vote_ids.iter().collect();

        let mut missing_claims: Vec<Claim> = claims
            .get_all()
            .into_iter()
            .filter(|c| !c.deleted && !known_claims.contains(&c.id))
            .cloned()
            .collect();
        missing_claims.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut missing_votes: Vec<Vote> = votes
            .all_votes()
            .filter(|v| !known_votes.contains(&v.id))
            .filter(|v| claims.get_claim(&v.claim_id).is_some_and(|c| !c.deleted))
            .cloned()
            .collect();
        missing_votes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        (missing_claims, missing_votes)
    }

    /// Validate and merge one inbound claim.
    pub fn apply_claim(
        &self,
        claims: &mut ClaimStore,
        claim: Claim,
    ) -> Result<ClaimId, InboundRejection> {
        validate_claim(&claim, claims, self.clock.now(), &self.params)?;
        let id = claim.id;
        match claims.merge_remote(claim) {
            Ok(true) => Ok(id),
            Ok(false) => Err(InboundRejection::Duplicate),
            Err(e) => Err(InboundRejection::Refused(e.to_string())),
        }
    }

    /// Validate and merge one inbound vote. The local ledger is never touched.
    pub fn apply_vote(
        &self,
        claims: &mut ClaimStore,
        votes: &mut VotingEngine,
        vote: Vote,
    ) -> Result<VoteId, InboundRejection> {
        validate_vote(&vote, claims, votes, &self.params)?;
        let id = vote.id;
        match votes.merge_remote_vote(claims, vote) {
            Ok(()) => Ok(id),
            Err(VotingError::DuplicateVote(_)) => Err(InboundRejection::Duplicate),
            Err(e) => Err(InboundRejection::Refused(e.to_string())),
        }
    }

    /// Merge a batch: claims first, then votes in timestamp order.
    pub fn apply_records(
        &self,
        claims: &mut ClaimStore,
        votes: &mut VotingEngine,
        peer: &IdentityId,
        inbound_claims: Vec<Claim>,
        mut inbound_votes: Vec<Vote>,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        for claim in inbound_claims {
            let record = claim.id.to_hex();
            match self.apply_claim(claims, claim) {
                Ok(id) => report.claims_merged.push(id),
                Err(reason) => {
                    log_rejection(peer, &record, &reason);
                    report.reject(record, reason);
                }
            }
        }

        inbound_votes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        for vote in inbound_votes {
            let record = vote.id.to_hex();
            match self.apply_vote(claims, votes, vote) {
                Ok(id) => report.votes_merged.push(id),
                Err(reason) => {
                    log_rejection(peer, &record, &reason);
                    report.reject(record, reason);
                }
            }
        }

        report
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// React to one transport event.
    pub fn handle_event(
        &mut self,
        event: TransportEvent,
        claims: &mut ClaimStore,
        votes: &mut VotingEngine,
    ) -> ReplicationOutcome {
        match event {
            TransportEvent::Opened => ReplicationOutcome::Opened,
            TransportEvent::PeerConnected(peer) => {
                self.on_connected(&peer, claims, votes);
                ReplicationOutcome::PeerConnected(peer)
            }
            TransportEvent::PeerDisconnected(peer) => {
                let now = self.clock.now();
                if self.sessions.state(&peer).is_live() {
                    if let Err(e) = self.sessions.transition(&peer, SessionState::Closed, now) {
                        tracing::debug!(peer = %peer.short(), error = %e, "ignoring disconnect");
                    }
                }
                tracing::info!(peer = %peer.short(), "peer disconnected");
                ReplicationOutcome::PeerDisconnected(peer)
            }
            TransportEvent::Message { peer, envelope } => {
                self.on_message(peer, envelope, claims, votes)
            }
            TransportEvent::Error { peer, reason } => {
                tracing::warn!(peer = ?peer.as_ref().map(|p| p.short()), %reason, "transport error");
                if let Some(p) = &peer {
                    if self.sessions.state(p).is_live() {
                        let _ = self
                            .sessions
                            .transition(p, SessionState::Errored, self.clock.now());
                    }
                }
                ReplicationOutcome::TransportError { peer, reason }
            }
        }
    }

    fn on_connected(&mut self, peer: &IdentityId, claims: &ClaimStore, votes: &VotingEngine) {
        let now = self.clock.now();
        if self.sessions.state(peer) != SessionState::Open {
            if let Err(e) = self.sessions.transition(peer, SessionState::Open, now) {
                tracing::debug!(peer = %peer.short(), error = %e, "unexpected connect");
                return;
            }
        }
        tracing::info!(peer = %peer.short(), "peer connected");
        let request = Self::build_sync_request(claims, votes);
        self.send_to(peer, request);
    }

    fn on_message(
        &mut self,
        peer: IdentityId,
        envelope: Envelope,
        claims: &mut ClaimStore,
        votes: &mut VotingEngine,
    ) -> ReplicationOutcome {
        if envelope.header.sender != peer {
            let reason = InboundRejection::SenderMismatch;
            tracing::warn!(peer = %peer.short(), sender = %envelope.header.sender, "dropping message");
            return ReplicationOutcome::Dropped { peer, reason };
        }
        let message = envelope.message.message_type();
        let report = match envelope.message {
            ReplicationMessage::SyncRequest {
                known_claim_ids,
                known_vote_ids,
            } => {
                let (missing_claims, missing_votes) =
                    Self::missing_records(claims, votes, &known_claim_ids, &known_vote_ids);
                let (claim_count, vote_count) = (missing_claims.len(), missing_votes.len());
                let frames = match sync_responses(missing_claims, missing_votes, self.sync_budget) {
                    Ok(chunks) => {
                        let frames = chunks.len();
                        for chunk in chunks {
                            self.send_to(&peer, chunk);
                        }
                        frames
                    }
                    Err(e) => {
                        tracing::warn!(peer = %peer.short(), error = %e, "could not build sync answer");
                        0
                    }
                };
                tracing::debug!(
                    peer = %peer.short(),
                    claims = claim_count,
                    votes = vote_count,
                    frames,
                    "answered sync request"
                );
                return ReplicationOutcome::SyncAnswered {
                    peer,
                    claims: claim_count,
                    votes: vote_count,
                    frames,
                };
            }
            ReplicationMessage::SyncResponse {
                claims: inbound_claims,
                votes: inbound_votes,
            } => {
                let report = self.apply_records(claims, votes, &peer, inbound_claims, inbound_votes);
                self.sessions.mark_synced(&peer);
                tracing::info!(
                    peer = %peer.short(),
                    claims = report.claims_merged.len(),
                    votes = report.votes_merged.len(),
                    rejected = report.rejected.len(),
                    "sync applied"
                );
                report
            }
            ReplicationMessage::NewClaim(claim) => {
                self.apply_records(claims, votes, &peer, vec![claim], Vec::new())
            }
            ReplicationMessage::NewVote(vote) => {
                self.apply_records(claims, votes, &peer, Vec::new(), vec![vote])
            }
        };
        ReplicationOutcome::Merged {
            peer,
            message,
            report,
        }
    }

    // ── Push ────────────────────────────────────────────────────────────

    /// Send `message` to every open session. Returns the number reached;
    /// failures are logged and otherwise ignored.
    pub fn announce(&self, message: ReplicationMessage) -> usize {
        let envelope = self.envelope(message);
        let mut reached = 0;
        for peer in self.sessions.open_peers() {
            match self.transport.send(&peer, &envelope) {
                Ok(()) => reached += 1,
                Err(e) => tracing::debug!(peer = %peer.short(), error = %e, "push failed"),
            }
        }
        reached
    }

    /// Push a freshly posted claim followed by its author's vote.
    pub fn announce_claim(&self, claim: &Claim, author_vote: &Vote) -> usize {
        let reached = self.announce(ReplicationMessage::NewClaim(claim.clone()));
        self.announce(ReplicationMessage::NewVote(author_vote.clone()));
        reached
    }

    pub fn announce_vote(&self, vote: &Vote) -> usize {
        self.announce(ReplicationMessage::NewVote(vote.clone()))
    }

    // ── Discovery ───────────────────────────────────────────────────────

    /// Identities worth dialing: claim authors we know of plus whatever
    /// the rendezvous lists, minus ourselves and live sessions.
    pub fn candidate_peers(&self, claims: &ClaimStore) -> Vec<IdentityId> {
        let mut candidates: BTreeSet<IdentityId> = claims.authors();
        if let Some(rendezvous) = &self.rendezvous {
            match rendezvous.list_active() {
                Ok(active) => candidates.extend(active),
                Err(e) => tracing::warn!(error = %e, "rendezvous listing failed"),
            }
        }
        candidates
            .into_iter()
            .filter(|id| id != &self.local_id && !self.sessions.state(id).is_live())
            .collect()
    }

    /// Refresh our rendezvous registration and dial every candidate.
    /// Returns the number of successful dials.
    pub fn probe(&mut self, claims: &ClaimStore) -> usize {
        self.register();
        let now = self.clock.now();
        let mut dialed = 0;
        for peer in self.candidate_peers(claims) {
            if let Err(e) = self.sessions.transition(&peer, SessionState::Connecting, now) {
                tracing::debug!(peer = %peer.short(), error = %e, "skipping dial");
                continue;
            }
            match self.transport.dial(&peer) {
                Ok(()) => dialed += 1,
                Err(e) => {
                    tracing::debug!(peer = %peer.short(), error = %e, "dial failed");
                    let _ = self.sessions.transition(&peer, SessionState::Errored, now);
                }
            }
        }
        dialed
    }

    /// Close every session and the transport without waiting for
    /// in-flight messages. Returns the number of sessions closed.
    pub fn shutdown(&mut self) -> usize {
        let closed = self.sessions.close_all(self.clock.now());
        self.transport.close();
        tracing::info!(node = %self.local_id, sessions = closed, "replication stopped");
        closed
    }

    fn register(&self) {
        if let Some(rendezvous) = &self.rendezvous {
            match rendezvous.register(&self.local_id) {
                Ok(active) => tracing::debug!(active, "registered with rendezvous"),
                Err(e) => tracing::warn!(error = %e, "rendezvous registration failed"),
            }
        }
    }

    fn envelope(&self, message: ReplicationMessage) -> Envelope {
        Envelope::new(self.local_id.clone(), self.clock.now(), message)
    }

    fn send_to(&self, peer: &IdentityId, message: ReplicationMessage) {
        let envelope = self.envelope(message);
        if let Err(e) = self.transport.send(peer, &envelope) {
            tracing::warn!(peer = %peer.short(), error = %e, "send failed");
        }
    }
}

fn log_rejection(peer: &IdentityId, record: &str, reason: &InboundRejection) {
    if reason.is_benign() {
        tracing::debug!(peer = %peer.short(), record, %reason, "skipped inbound record");
    } else {
        tracing::warn!(peer = %peer.short(), record, %reason, "rejected inbound record");
    }
}
