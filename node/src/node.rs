//! The Rumorality node: one local participant, its claim and vote stores,
//! the sealer, and replication, wired to injected collaborators.
//!
//! All mutable engine state sits behind a single async mutex. Local
//! actions, the inbound replication task, and the periodic seal pass all
//! take that lock, so a tally is never updated concurrently and a seal
//! decision always sees a consistent snapshot. Events are emitted after
//! the lock is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use rumorality_claims::{ClaimStore, FeedFilter};
use rumorality_consensus::{ConsensusSealer, SealReport, SettlementEngine};
use rumorality_ledger::{HistoryEntry, Participant};
use rumorality_messages::MessageType;
use rumorality_network::{
    Rendezvous, ReplicationOutcome, ReplicationProtocol, Transport, TransportEvent,
};
use rumorality_store::RecordStore;
use rumorality_types::{AttestationProvider, Claim, ClaimId, Clock, IdentityId, Vote};
use rumorality_voting::VotingEngine;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::{CoreEvent, EventBus};
use crate::metrics::NodeMetrics;
use crate::shutdown::{ShutdownController, ShutdownSignal};
use crate::tracing_spans;

/// How long shutdown waits for background tasks to notice the signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// External collaborators a node is built from.
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub clock: Arc<dyn Clock>,
    pub attestation: Arc<dyn AttestationProvider>,
    pub transport: Arc<dyn Transport>,
    pub rendezvous: Option<Arc<dyn Rendezvous>>,
}

/// Everything guarded by the node's state lock.
pub struct NodeState {
    pub participant: Participant,
    pub claims: ClaimStore,
    pub voting: VotingEngine,
    pub replication: ReplicationProtocol,
}

/// A point-in-time summary of a node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: IdentityId,
    pub balance: u64,
    pub credibility: u32,
    pub claims: usize,
    pub votes: usize,
    pub open_sessions: usize,
}

struct NodeCore {
    config: NodeConfig,
    local_id: IdentityId,
    state: Mutex<NodeState>,
    sealer: ConsensusSealer,
    events: EventBus,
    metrics: Option<NodeMetrics>,
    store: Arc<dyn RecordStore>,
}

pub struct RumorNode {
    core: Arc<NodeCore>,
    shutdown: ShutdownController,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl RumorNode {
    /// Load (or create) the local participant from the store and rebuild
    /// the claim and vote indexes.
    pub fn new(config: NodeConfig, deps: Collaborators) -> Result<Self, NodeError> {
        config.params.validate()?;
        let participant = Participant::load(
            deps.store.as_ref(),
            config.params.clone(),
            deps.clock.clone(),
            deps.attestation.as_ref(),
        )?;
        Self::with_participant(config, participant, deps)
    }

    /// Build a node around an already constructed participant.
    pub fn with_participant(
        config: NodeConfig,
        participant: Participant,
        deps: Collaborators,
    ) -> Result<Self, NodeError> {
        config.params.validate()?;
        let params = config.params.clone();
        let local_id = participant.id().clone();
        let claims = ClaimStore::load(params.clone(), deps.clock.clone(), deps.store.clone())?;
        let voting = VotingEngine::load(params.clone(), deps.clock.clone(), deps.store.clone())?;
        let replication = ReplicationProtocol::new(
            local_id.clone(),
            deps.transport,
            deps.rendezvous,
            params.clone(),
            deps.clock.clone(),
        );
        let sealer = ConsensusSealer::new(
            params,
            deps.clock.clone(),
            SettlementEngine::new(deps.store.clone()),
        );
        let metrics = if config.enable_metrics {
            let metrics = NodeMetrics::new()?;
            metrics
                .reputation_balance
                .set(participant.ledger.balance() as i64);
            Some(metrics)
        } else {
            None
        };

        tracing::info!(
            node = %local_id,
            balance = participant.ledger.balance(),
            claims = claims.len(),
            votes = voting.len(),
            "node initialised"
        );

        Ok(Self {
            core: Arc::new(NodeCore {
                config,
                local_id,
                state: Mutex::new(NodeState {
                    participant,
                    claims,
                    voting,
                    replication,
                }),
                sealer,
                events: EventBus::new(),
                metrics,
                store: deps.store,
            }),
            shutdown: ShutdownController::new(),
            task_handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Open the transport and spawn the background tasks: the inbound
    /// replication loop, the seal/decay loop, and the peer-probe loop.
    /// Loops whose interval is zero are not spawned.
    pub async fn start(&self) -> Result<(), NodeError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(NodeError::AlreadyStarted);
        }
        let inbound = self.core.state.lock().await.replication.open()?;

        let mut handles = self.task_handles.lock().await;
        handles.push(spawn_inbound(
            Arc::clone(&self.core),
            inbound,
            self.shutdown.subscribe(),
        ));

        let seal_ms = self.core.config.seal_scan_interval_ms;
        if seal_ms > 0 {
            let core = Arc::clone(&self.core);
            handles.push(spawn_periodic(
                "maintenance",
                seal_ms,
                self.shutdown.subscribe(),
                move || {
                    let core = Arc::clone(&core);
                    async move {
                        core.seal_pass().await;
                        if let Err(e) = core.decay_tick().await {
                            tracing::warn!(error = %e, "decay tick failed");
                        }
                    }
                },
            ));
        }

        let probe_ms = self.core.config.peer_probe_interval_ms;
        if probe_ms > 0 {
            let core = Arc::clone(&self.core);
            handles.push(spawn_periodic(
                "peer probe",
                probe_ms,
                self.shutdown.subscribe(),
                move || {
                    let core = Arc::clone(&core);
                    async move {
                        core.probe_peers().await;
                    }
                },
            ));
        }

        tracing::info!(node = %self.core.local_id, tasks = handles.len(), "node started");
        Ok(())
    }

    /// Stop background tasks and close every peer session without waiting
    /// for in-flight messages. The local account is persisted.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        tracing::info!(node = %self.core.local_id, "node stopping");
        self.shutdown.shutdown();

        {
            let mut st = self.core.state.lock().await;
            st.replication.shutdown();
            st.participant.persist(self.core.store.as_ref())?;
        }
        if let Some(m) = &self.core.metrics {
            m.open_sessions.set(0);
        }

        let handles: Vec<JoinHandle<()>> = self.task_handles.lock().await.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        tracing::info!(node = %self.core.local_id, "node stopped");
        Ok(())
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Post a claim staked from the local balance and push it to peers.
    pub async fn post_claim(
        &self,
        content: &str,
        stake: u64,
        duration_hours: Option<u64>,
    ) -> Result<Claim, NodeError> {
        let span = tracing_spans::post_claim_span(self.core.local_id.short(), stake);
        self.core
            .post_claim(content, stake, duration_hours)
            .instrument(span)
            .await
    }

    /// Cast `count` votes in `direction` ("true" or "false") and push the
    /// vote to peers.
    pub async fn cast_vote(
        &self,
        claim_id: &ClaimId,
        direction: &str,
        count: u64,
    ) -> Result<Vote, NodeError> {
        let span =
            tracing_spans::cast_vote_span(self.core.local_id.short(), &claim_id.short(), count);
        self.core
            .cast_vote(claim_id, direction, count)
            .instrument(span)
            .await
    }

    /// Tombstone one of the local participant's claims.
    pub async fn delete_claim(&self, claim_id: &ClaimId) -> Result<Claim, NodeError> {
        self.core.delete_claim(claim_id).await
    }

    pub async fn seal_pass(&self) -> Vec<SealReport> {
        self.core.seal_pass().await
    }

    pub async fn force_seal(&self, claim_id: &ClaimId) -> Result<Option<SealReport>, NodeError> {
        self.core.force_seal(claim_id).await
    }

    pub async fn decay_tick(&self) -> Result<Option<u64>, NodeError> {
        self.core.decay_tick().await
    }

    /// Dial candidate peers; returns the number of successful dials.
    pub async fn probe_peers(&self) -> usize {
        self.core.probe_peers().await
    }

    /// Feed a transport event by hand (for embedders that own the loop).
    pub async fn handle_transport_event(&self, event: TransportEvent) {
        self.core.handle_transport_event(event).await
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn local_id(&self) -> &IdentityId {
        &self.core.local_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.core.config
    }

    pub fn events(&self) -> &EventBus {
        &self.core.events
    }

    pub fn metrics(&self) -> Option<&NodeMetrics> {
        self.core.metrics.as_ref()
    }

    pub async fn feed(&self, filter: FeedFilter) -> Vec<Claim> {
        let st = self.core.state.lock().await;
        st.claims.get_feed(filter).into_iter().cloned().collect()
    }

    pub async fn get_claim(&self, claim_id: &ClaimId) -> Option<Claim> {
        self.core.state.lock().await.claims.get_claim(claim_id).cloned()
    }

    pub async fn votes_for_claim(&self, claim_id: &ClaimId) -> Vec<Vote> {
        let st = self.core.state.lock().await;
        st.voting.votes_for_claim(claim_id).into_iter().cloned().collect()
    }

    /// The local participant's vote on a claim, if any.
    pub async fn my_vote(&self, claim_id: &ClaimId) -> Option<Vote> {
        let st = self.core.state.lock().await;
        st.voting.user_vote(claim_id, &self.core.local_id).cloned()
    }

    pub async fn trust_score(&self, claim_id: &ClaimId) -> Option<f64> {
        self.core.state.lock().await.claims.trust_score(claim_id)
    }

    pub async fn balance(&self) -> u64 {
        self.core.state.lock().await.participant.ledger.balance()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.core.state.lock().await.participant.ledger.history()
    }

    pub async fn vote_cost(&self, count: u64) -> u64 {
        self.core.state.lock().await.voting.vote_cost(count)
    }

    pub async fn open_peers(&self) -> Vec<IdentityId> {
        self.core.state.lock().await.replication.open_peers()
    }

    pub async fn snapshot(&self) -> NodeSnapshot {
        let st = self.core.state.lock().await;
        NodeSnapshot {
            id: self.core.local_id.clone(),
            balance: st.participant.ledger.balance(),
            credibility: st.participant.credibility_score(),
            claims: st.claims.len(),
            votes: st.voting.len(),
            open_sessions: st.replication.sessions().open_count(),
        }
    }

    /// Run `f` against the locked state.
    pub async fn with_state<R>(&self, f: impl FnOnce(&NodeState) -> R) -> R {
        let st = self.core.state.lock().await;
        f(&st)
    }
}

// ── Core operations ─────────────────────────────────────────────────────

impl NodeCore {
    async fn post_claim(
        &self,
        content: &str,
        stake: u64,
        duration_hours: Option<u64>,
    ) -> Result<Claim, NodeError> {
        let (claim, vote, balance) = {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            let (claim, vote) =
                st.claims
                    .create_claim(content, &mut st.participant, stake, duration_hours)?;
            st.voting.record_author_vote(vote.clone())?;
            let reached = st.replication.announce_claim(&claim, &vote);
            tracing::debug!(claim = %claim.id.short(), peers = reached, "claim announced");
            (claim, vote, st.participant.ledger.balance())
        };

        if let Some(m) = &self.metrics {
            m.claims_posted.inc();
            m.reputation_balance.set(balance as i64);
        }
        self.events.emit(&CoreEvent::ClaimPosted {
            claim: claim.id,
            author: claim.author_id.clone(),
            stake: claim.stake,
        });
        self.events.emit(&vote_recorded(&vote, false));
        Ok(claim)
    }

    async fn cast_vote(
        &self,
        claim_id: &ClaimId,
        direction: &str,
        count: u64,
    ) -> Result<Vote, NodeError> {
        let (vote, balance) = {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            let vote =
                st.voting
                    .cast_vote(&mut st.claims, &mut st.participant, claim_id, direction, count)?;
            let reached = st.replication.announce_vote(&vote);
            tracing::debug!(claim = %claim_id.short(), peers = reached, "vote announced");
            (vote, st.participant.ledger.balance())
        };

        if let Some(m) = &self.metrics {
            m.votes_cast.inc();
            m.reputation_balance.set(balance as i64);
        }
        self.events.emit(&vote_recorded(&vote, false));
        Ok(vote)
    }

    async fn delete_claim(&self, claim_id: &ClaimId) -> Result<Claim, NodeError> {
        let claim = self
            .state
            .lock()
            .await
            .claims
            .delete_claim(claim_id, &self.local_id)?;
        self.events
            .emit(&CoreEvent::ClaimDeleted { claim: claim.id });
        Ok(claim)
    }

    async fn seal_pass(&self) -> Vec<SealReport> {
        let (reports, balance) = {
            let mut guard = self.state.lock().await;
            let _span = tracing_spans::seal_pass_span(self.local_id.short()).entered();
            let st = &mut *guard;
            let reports = self
                .sealer
                .scan(&mut st.claims, &st.voting, &mut st.participant);
            (reports, st.participant.ledger.balance())
        };
        self.after_seal(&reports, balance);
        reports
    }

    async fn force_seal(&self, claim_id: &ClaimId) -> Result<Option<SealReport>, NodeError> {
        let (report, balance) = {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            let report =
                self.sealer
                    .force_seal(&mut st.claims, &st.voting, &mut st.participant, claim_id)?;
            (report, st.participant.ledger.balance())
        };
        self.after_seal(report.as_slice(), balance);
        Ok(report)
    }

    fn after_seal(&self, reports: &[SealReport], balance: u64) {
        if reports.is_empty() {
            return;
        }
        if let Some(m) = &self.metrics {
            m.claims_sealed.inc_by(reports.len() as u64);
            m.reputation_balance.set(balance as i64);
        }
        for report in reports {
            self.events.emit(&CoreEvent::ClaimSealed {
                claim: report.claim_id,
                outcome: report.outcome,
                trigger: report.trigger,
            });
            self.events.emit(&CoreEvent::SettlementApplied {
                claim: report.claim_id,
                credited: report.settlement.local_credit,
            });
        }
    }

    async fn decay_tick(&self) -> Result<Option<u64>, NodeError> {
        let (removed, balance) = {
            let mut st = self.state.lock().await;
            let removed = st.participant.ledger.apply_decay();
            if removed.is_some() {
                st.participant.persist(self.store.as_ref())?;
            }
            (removed, st.participant.ledger.balance())
        };
        if let Some(amount) = removed {
            if let Some(m) = &self.metrics {
                m.reputation_balance.set(balance as i64);
            }
            self.events
                .emit(&CoreEvent::ReputationDecayed { amount, balance });
        }
        Ok(removed)
    }

    async fn probe_peers(&self) -> usize {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        let dialed = st.replication.probe(&st.claims);
        if dialed > 0 {
            tracing::debug!(dialed, "probed peers");
        }
        dialed
    }

    async fn handle_transport_event(&self, event: TransportEvent) {
        let mut emitted = Vec::new();
        let open_sessions = {
            let mut guard = self.state.lock().await;
            let _span = tracing_spans::replication_span(self.local_id.short()).entered();
            let st = &mut *guard;
            let outcome = st
                .replication
                .handle_event(event, &mut st.claims, &mut st.voting);
            self.translate(outcome, st, &mut emitted);
            st.replication.sessions().open_count()
        };
        if let Some(m) = &self.metrics {
            m.open_sessions.set(open_sessions as i64);
        }
        for event in &emitted {
            self.events.emit(event);
        }
    }

    /// Turn a replication outcome into domain events and metric updates.
    fn translate(&self, outcome: ReplicationOutcome, st: &NodeState, out: &mut Vec<CoreEvent>) {
        match outcome {
            ReplicationOutcome::Opened
            | ReplicationOutcome::SyncAnswered { .. }
            | ReplicationOutcome::TransportError { .. } => {}
            ReplicationOutcome::PeerConnected(peer) => out.push(CoreEvent::PeerConnected { peer }),
            ReplicationOutcome::PeerDisconnected(peer) => {
                out.push(CoreEvent::PeerDisconnected { peer })
            }
            ReplicationOutcome::Dropped { peer, reason } => {
                if let Some(m) = &self.metrics {
                    m.inbound_rejected.inc();
                }
                out.push(CoreEvent::InboundRejected {
                    peer,
                    record: None,
                    reason,
                });
            }
            ReplicationOutcome::Merged {
                peer,
                message,
                report,
            } => {
                if let Some(m) = &self.metrics {
                    m.claims_merged.inc_by(report.claims_merged.len() as u64);
                    m.votes_merged.inc_by(report.votes_merged.len() as u64);
                    m.inbound_rejected.inc_by(report.rejected.len() as u64);
                }
                for id in &report.claims_merged {
                    if let Some(claim) = st.claims.get_claim(id) {
                        out.push(CoreEvent::ClaimReceived {
                            claim: *id,
                            author: claim.author_id.clone(),
                        });
                    }
                }
                for id in &report.votes_merged {
                    if let Some(vote) = st.voting.get_vote(id) {
                        out.push(vote_recorded(vote, true));
                    }
                }
                for rejected in report.rejected.iter().cloned() {
                    out.push(CoreEvent::InboundRejected {
                        peer: peer.clone(),
                        record: Some(rejected.record),
                        reason: rejected.reason,
                    });
                }
                if message == MessageType::SyncResponse {
                    out.push(CoreEvent::PeerSynced {
                        peer,
                        claims: report.claims_merged.len(),
                        votes: report.votes_merged.len(),
                    });
                }
            }
        }
    }
}

fn vote_recorded(vote: &Vote, remote: bool) -> CoreEvent {
    CoreEvent::VoteRecorded {
        claim: vote.claim_id,
        vote: vote.id,
        voter: vote.voter_id.clone(),
        direction: vote.direction,
        weight: vote.weight,
        remote,
    }
}

// ── Background tasks ────────────────────────────────────────────────────

fn spawn_inbound(
    core: Arc<NodeCore>,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
    mut signal: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = signal.triggered() => {
                    tracing::debug!("inbound task shutting down");
                    break;
                }
                event = inbound.recv() => match event {
                    Some(event) => core.handle_transport_event(event).await,
                    None => {
                        tracing::debug!("transport closed, inbound task exiting");
                        break;
                    }
                },
            }
        }
    })
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    interval_ms: u64,
    mut signal: ShutdownSignal,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = signal.triggered() => {
                    tracing::debug!(task = name, "task shutting down");
                    break;
                }
                _ = interval.tick() => tick().await,
            }
        }
    })
}
