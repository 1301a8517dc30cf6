//! End-to-end scenarios: several nodes in one process, wired through an
//! in-memory mesh, a shared rendezvous, and a shared deterministic clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumorality_claims::{ClaimError, FeedFilter};
use rumorality_consensus::SealTrigger;
use rumorality_crypto::{claim_signing_payload, verify_signature};
use rumorality_messages::{Envelope, ReplicationMessage};
use rumorality_network::{
    InMemoryRendezvous, InboundRejection, MemoryMesh, Transport, TransportEvent,
};
use rumorality_node::{Collaborators, CoreEvent, NodeConfig, NodeError, RumorNode};
use rumorality_nullables::{NullAttestation, NullClock};
use rumorality_store::MemoryStore;
use rumorality_types::{Clock, Direction, IdentityId, Outcome, MILLIS_PER_DAY};
use rumorality_voting::VotingError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

macro_rules! eventually {
    ($cond:expr) => {{
        let mut held = false;
        for _ in 0..300 {
            if $cond {
                held = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(held, "condition never held: {}", stringify!($cond));
    }};
}

struct Net {
    mesh: MemoryMesh,
    rendezvous: Arc<InMemoryRendezvous>,
    clock: Arc<NullClock>,
}

impl Net {
    fn new() -> Self {
        let clock = Arc::new(NullClock::default());
        Self {
            mesh: MemoryMesh::new(),
            rendezvous: Arc::new(InMemoryRendezvous::with_ttl(clock.clone(), 365 * MILLIS_PER_DAY)),
            clock,
        }
    }

    fn collaborators(&self, device: &str, store: Arc<MemoryStore>) -> Collaborators {
        Collaborators {
            store,
            clock: self.clock.clone(),
            attestation: Arc::new(NullAttestation::new(device)),
            transport: Arc::new(self.mesh.endpoint()),
            rendezvous: Some(self.rendezvous.clone()),
        }
    }

    async fn node(&self, device: &str) -> RumorNode {
        self.node_with(device, NodeConfig::manual()).await
    }

    async fn node_with(&self, device: &str, config: NodeConfig) -> RumorNode {
        let node = RumorNode::new(config, self.collaborators(device, Arc::new(MemoryStore::new())))
            .unwrap();
        node.start().await.unwrap();
        node
    }
}

/// Dial from every node in turn until each sees all the others.
async fn connect_all(nodes: &[&RumorNode]) {
    let expected = nodes.len() - 1;
    for node in nodes {
        node.probe_peers().await;
        eventually!(node.open_peers().await.len() == expected);
    }
    for node in nodes {
        eventually!(node.open_peers().await.len() == expected);
    }
}

fn record_events(node: &RumorNode) -> Arc<std::sync::Mutex<Vec<CoreEvent>>> {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    node.events().subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    seen
}

// ---------------------------------------------------------------------------
// Replication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signed_claim_round_trips_between_nodes() {
    let net = Net::new();
    let a = net.node("device-a").await;
    let b = net.node("device-b").await;
    connect_all(&[&a, &b]).await;

    let posted = a.post_claim("the river is rising", 10, None).await.unwrap();
    eventually!(b.get_claim(&posted.id).await.is_some());

    let received = b.get_claim(&posted.id).await.unwrap();
    assert_eq!(received.id, posted.id);
    assert_eq!(received.content, posted.content);
    assert_eq!(received.author_id, *a.local_id());
    let payload = claim_signing_payload(&received.content, received.created_at, received.stake);
    assert!(verify_signature(&payload, &received.signature, &received.public_key));

    // The author's vote follows the claim and rebuilds the same tally.
    eventually!(b.votes_for_claim(&posted.id).await.len() == 1);
    let received = b.get_claim(&posted.id).await.unwrap();
    assert_eq!(received.tally, posted.tally);
}

#[tokio::test]
async fn late_joiner_catches_up_through_sync() {
    let net = Net::new();
    let a = net.node("device-a").await;
    let first = a.post_claim("posted before anyone listened", 10, None).await.unwrap();
    let second = a.post_claim("and another one", 20, None).await.unwrap();

    let b = net.node("device-b").await;
    let events = record_events(&b);
    connect_all(&[&a, &b]).await;

    eventually!(b.feed(FeedFilter::All).await.len() == 2);
    assert!(b.get_claim(&first.id).await.is_some());
    assert!(b.get_claim(&second.id).await.is_some());
    eventually!(b.votes_for_claim(&second.id).await.len() == 1);
    eventually!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, CoreEvent::PeerSynced { claims: 2, .. })));
}

#[tokio::test]
async fn forged_claim_from_a_peer_never_appears_locally() {
    let net = Net::new();
    let honest = net.node("device-a").await;
    let victim = net.node("device-b").await;
    let events = record_events(&victim);
    connect_all(&[&honest, &victim]).await;

    let mut forged = honest.post_claim("original words", 10, None).await.unwrap();
    eventually!(victim.get_claim(&forged.id).await.is_some());

    // A rogue endpoint replays the claim with altered content and a fresh id.
    forged.content = "altered words".into();
    forged.id = rumorality_crypto::claim_id(
        &forged.content,
        &forged.author_id,
        forged.created_at,
        forged.stake,
    );
    let rogue_id = IdentityId::new("rogue-peer-0001");
    let rogue = net.mesh.endpoint();
    let _rogue_events = rogue.open(&rogue_id).unwrap();
    rogue.dial(victim.local_id()).unwrap();
    eventually!(victim.open_peers().await.contains(&rogue_id));
    rogue
        .send(
            victim.local_id(),
            &Envelope::new(
                rogue_id.clone(),
                net.clock.now(),
                ReplicationMessage::NewClaim(forged.clone()),
            ),
        )
        .unwrap();

    eventually!(events.lock().unwrap().iter().any(|e| matches!(
        e,
        CoreEvent::InboundRejected {
            reason: InboundRejection::BadSignature,
            ..
        }
    )));
    assert!(victim.get_claim(&forged.id).await.is_none());
    assert_eq!(victim.feed(FeedFilter::All).await.len(), 1);
}

#[tokio::test]
async fn shutdown_closes_sessions_on_both_sides() {
    let net = Net::new();
    let a = net.node("device-a").await;
    let b = net.node("device-b").await;
    connect_all(&[&a, &b]).await;

    a.shutdown().await.unwrap();
    assert!(a.open_peers().await.is_empty());
    eventually!(b.open_peers().await.is_empty());
}

// ---------------------------------------------------------------------------
// Voting and sealing across nodes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn supermajority_seals_true_before_the_window() {
    // Linear pricing, so each vote below stakes exactly 10.
    let mut config = NodeConfig::manual();
    config.params.quadratic_voting = false;
    let net = Net::new();
    let author = net.node_with("device-author", config.clone()).await;
    let voters = [
        net.node_with("device-1", config.clone()).await,
        net.node_with("device-2", config.clone()).await,
        net.node_with("device-3", config).await,
    ];
    let mut all: Vec<&RumorNode> = vec![&author];
    all.extend(voters.iter());
    connect_all(&all).await;

    let claim = author.post_claim("bridge closed for repairs", 10, None).await.unwrap();
    for voter in &voters {
        eventually!(voter.get_claim(&claim.id).await.is_some());
        let vote = voter.cast_vote(&claim.id, "true", 10).await.unwrap();
        assert_eq!(vote.stake, 10);
    }
    eventually!(author.votes_for_claim(&claim.id).await.len() == 4);

    let sealed = author.seal_pass().await;
    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].outcome, Outcome::True);
    assert_eq!(sealed[0].trigger, SealTrigger::Supermajority);

    let stored = author.get_claim(&claim.id).await.unwrap();
    assert!(stored.sealed);
    assert_eq!(stored.outcome, Some(Outcome::True));
    // The winning auto-vote pays back 10 and the verified post stake
    // comes back on top of it.
    assert_eq!(author.balance().await, 110);
}

#[tokio::test]
async fn new_account_cannot_vote_on_a_trending_claim() {
    let net = Net::new();
    let author = net.node("device-author").await;
    let backer = net.node("device-backer").await;
    net.clock.advance(8 * MILLIS_PER_DAY);
    let newcomer = net.node("device-new").await;
    connect_all(&[&author, &backer, &newcomer]).await;

    let claim = author.post_claim("stadium roof collapsed", 60, None).await.unwrap();
    eventually!(backer.get_claim(&claim.id).await.is_some());
    backer.cast_vote(&claim.id, "true", 7).await.unwrap();
    eventually!(newcomer.votes_for_claim(&claim.id).await.len() == 2);

    let err = newcomer.cast_vote(&claim.id, "false", 1).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Voting(VotingError::NewAccountCooldown(id)) if id == claim.id
    ));
    assert_eq!(newcomer.balance().await, 100);
}

#[tokio::test]
async fn second_identity_on_the_same_device_is_refused() {
    let net = Net::new();
    let author = net.node("device-author").await;
    let first = net.node("shared-phone").await;
    let second = net.node("shared-phone").await;
    connect_all(&[&author, &first, &second]).await;

    let claim = author.post_claim("free concert tonight", 10, None).await.unwrap();
    eventually!(first.get_claim(&claim.id).await.is_some());
    first.cast_vote(&claim.id, "true", 2).await.unwrap();
    eventually!(second.votes_for_claim(&claim.id).await.len() == 2);

    let err = second.cast_vote(&claim.id, "true", 2).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Voting(VotingError::DeviceAlreadyVoted(_))
    ));
}

#[tokio::test]
async fn concurrent_votes_by_one_participant_record_exactly_one() {
    let net = Net::new();
    let author = net.node("device-author").await;
    let voter = Arc::new(net.node("device-voter").await);
    connect_all(&[&author, voter.as_ref()]).await;

    let claim = author.post_claim("power outage downtown", 10, None).await.unwrap();
    eventually!(voter.get_claim(&claim.id).await.is_some());

    let mut tasks = Vec::new();
    for direction in ["true", "false", "true", "false"] {
        let voter = Arc::clone(&voter);
        let id = claim.id;
        tasks.push(tokio::spawn(async move {
            voter.cast_vote(&id, direction, 2).await
        }));
    }
    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => assert!(matches!(
                e,
                NodeError::Voting(VotingError::AlreadyVoted { .. })
            )),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(voter.balance().await, 96);
    assert_eq!(voter.votes_for_claim(&claim.id).await.len(), 2);
}

#[tokio::test]
async fn tie_at_the_window_refunds_every_stake() {
    let net = Net::new();
    let author = net.node("device-author").await;
    let critic = net.node("device-critic").await;
    connect_all(&[&author, &critic]).await;

    let claim = author.post_claim("school closed tomorrow", 16, None).await.unwrap();
    eventually!(critic.get_claim(&claim.id).await.is_some());
    // Same balance and same stake on both sides gives equal weight.
    critic.cast_vote(&claim.id, "false", 4).await.unwrap();
    eventually!(author.votes_for_claim(&claim.id).await.len() == 2);
    let tally = author.get_claim(&claim.id).await.unwrap().tally;
    assert_eq!(tally.true_side.weight, tally.false_side.weight);

    net.clock
        .advance(author.config().params.sealing_window_ms + 1);
    let author_report = author.seal_pass().await;
    let critic_report = critic.seal_pass().await;
    assert_eq!(author_report[0].outcome, Outcome::Tie);
    assert_eq!(author_report[0].trigger, SealTrigger::Timeout);
    assert_eq!(critic_report[0].outcome, Outcome::Tie);

    assert_eq!(author.balance().await, 100);
    assert_eq!(critic.balance().await, 100);
}

// ---------------------------------------------------------------------------
// Local lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_follow_local_actions() {
    let net = Net::new();
    let node = net.node("device-a").await;
    let events = record_events(&node);

    let claim = node.post_claim("a quiet rumor", 10, Some(1)).await.unwrap();
    let sealed = node.force_seal(&claim.id).await.unwrap();
    assert!(sealed.is_some());

    let seen = events.lock().unwrap().clone();
    assert!(matches!(
        seen[0],
        CoreEvent::ClaimPosted { stake: 10, .. }
    ));
    assert!(matches!(
        seen[1],
        CoreEvent::VoteRecorded {
            direction: Direction::True,
            remote: false,
            ..
        }
    ));
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::ClaimSealed { outcome: Outcome::True, .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::SettlementApplied { credited: 20, .. })));
}

#[tokio::test]
async fn only_the_author_may_delete() {
    let net = Net::new();
    let a = net.node("device-a").await;
    let b = net.node("device-b").await;
    connect_all(&[&a, &b]).await;

    let claim = a.post_claim("delete me later", 10, None).await.unwrap();
    eventually!(b.get_claim(&claim.id).await.is_some());

    let err = b.delete_claim(&claim.id).await.unwrap_err();
    assert!(matches!(err, NodeError::Claim(ClaimError::Unauthorized { .. })));

    let deleted = a.delete_claim(&claim.id).await.unwrap();
    assert_ne!(deleted.content, "delete me later");
    assert_eq!(deleted.id, claim.id);

    // The tombstone stays under the same id and keeps its tally.
    let (tombstoned, voters) = a
        .with_state(|st| {
            let c = st.claims.get_claim(&claim.id);
            (
                c.is_some_and(|c| c.deleted),
                c.map(|c| c.tally.true_side.voters.len()),
            )
        })
        .await;
    assert!(tombstoned);
    assert_eq!(voters, Some(1));
}

#[tokio::test]
async fn decay_tick_persists_and_reports() {
    let net = Net::new();
    let node = net.node("device-a").await;
    let decays = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&decays);
    node.events().subscribe(move |e| {
        if matches!(e, CoreEvent::ReputationDecayed { .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert_eq!(node.decay_tick().await.unwrap(), None);
    net.clock.advance(7 * MILLIS_PER_DAY + 1);
    let removed = node.decay_tick().await.unwrap();
    assert_eq!(removed, Some(5));
    assert_eq!(node.balance().await, 95);
    assert_eq!(decays.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn restart_restores_identity_and_records() {
    let net = Net::new();
    let store = Arc::new(MemoryStore::new());
    let first = RumorNode::new(NodeConfig::manual(), net.collaborators("device-a", store.clone()))
        .unwrap();
    let claim = first.post_claim("persisted rumor", 10, None).await.unwrap();
    let id = first.local_id().clone();
    first.shutdown().await.unwrap();

    let second =
        RumorNode::new(NodeConfig::manual(), net.collaborators("device-a", store)).unwrap();
    assert_eq!(second.local_id(), &id);
    assert_eq!(second.balance().await, 90);
    assert!(second.get_claim(&claim.id).await.is_some());
    assert!(second.my_vote(&claim.id).await.is_some());
}

#[tokio::test]
async fn start_twice_is_refused() {
    let net = Net::new();
    let node = net.node("device-a").await;
    assert!(matches!(node.start().await, Err(NodeError::AlreadyStarted)));
}

#[tokio::test]
async fn metrics_track_posts_and_votes() {
    let net = Net::new();
    let config = NodeConfig {
        enable_metrics: true,
        ..NodeConfig::manual()
    };
    let node = net.node_with("device-a", config).await;
    node.post_claim("counted rumor", 10, None).await.unwrap();

    let metrics = node.metrics().unwrap();
    assert_eq!(metrics.claims_posted.get(), 1);
    assert_eq!(metrics.reputation_balance.get(), 90);
    assert!(metrics
        .encode()
        .unwrap()
        .contains("rumorality_claims_posted_total 1"));
}

#[tokio::test]
async fn background_tasks_seal_without_manual_passes() {
    let net = Net::new();
    let config = NodeConfig {
        seal_scan_interval_ms: 20,
        peer_probe_interval_ms: 20,
        ..NodeConfig::manual()
    };
    let a = net.node_with("device-a", config.clone()).await;
    let b = net.node_with("device-b", config).await;

    // The probe task connects the pair on its own.
    eventually!(a.open_peers().await.contains(b.local_id()));

    let claim = a.post_claim("self-evident rumor", 10, None).await.unwrap();
    eventually!(a.get_claim(&claim.id).await.map(|c| c.sealed).unwrap_or(false));

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
}

#[tokio::test]
async fn inbound_events_can_be_fed_by_hand() {
    let net = Net::new();
    let node = RumorNode::new(
        NodeConfig::manual(),
        net.collaborators("device-a", Arc::new(MemoryStore::new())),
    )
    .unwrap();
    let events = record_events(&node);
    let peer = IdentityId::new("hand-fed-peer-01");

    node.handle_transport_event(TransportEvent::PeerConnected(peer.clone()))
        .await;
    assert_eq!(node.open_peers().await, vec![peer.clone()]);
    node.handle_transport_event(TransportEvent::PeerDisconnected(peer.clone()))
        .await;
    assert!(node.open_peers().await.is_empty());

    let seen = events.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            CoreEvent::PeerConnected { peer: peer.clone() },
            CoreEvent::PeerDisconnected { peer },
        ]
    );
}
