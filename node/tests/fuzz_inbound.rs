//! Property-based tests for the inbound replication boundary.
//!
//! A peer can send anything. Whatever a tampered claim looks like, it must
//! never reach local queries, and handling it must never take the node down.

use std::sync::Arc;

use proptest::prelude::*;

use rumorality_claims::FeedFilter;
use rumorality_crypto::{claim_id, claim_signing_payload, derive_identity_id, keypair_from_seed, sign_message};
use rumorality_messages::{Envelope, ReplicationMessage};
use rumorality_network::{MemoryMesh, TransportEvent};
use rumorality_node::{Collaborators, NodeConfig, RumorNode};
use rumorality_nullables::{NullAttestation, NullClock};
use rumorality_store::MemoryStore;
use rumorality_types::{Claim, Clock, IdentityId, Tally};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Tamper {
    AppendContent(String),
    BumpStake(u64),
    ShiftTimestamp(u64),
    FlipSignature { index: usize, mask: u8 },
    SwapKey([u8; 32]),
}

fn arb_tamper() -> impl Strategy<Value = Tamper> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(Tamper::AppendContent),
        (1u64..1_000).prop_map(Tamper::BumpStake),
        (1u64..3_600_000).prop_map(Tamper::ShiftTimestamp),
        (0usize..64, 1u8..=255).prop_map(|(index, mask)| Tamper::FlipSignature { index, mask }),
        any::<[u8; 32]>().prop_map(Tamper::SwapKey),
    ]
}

fn signed_claim(clock: &NullClock, seed: u8) -> Claim {
    let kp = keypair_from_seed(&[seed; 32]);
    let author = derive_identity_id(&kp.public);
    let ts = clock.now();
    let content = "the ferry is cancelled";
    Claim {
        id: claim_id(content, &author, ts, 10),
        content: content.to_string(),
        author_id: author,
        created_at: ts,
        expires_at: ts.plus_millis(3_600_000),
        stake: 10,
        signature: sign_message(&claim_signing_payload(content, ts, 10), &kp.private),
        public_key: kp.public,
        tally: Tally::default(),
        sealed: false,
        sealed_at: None,
        outcome: None,
        deleted: false,
        deleted_at: None,
    }
}

/// Apply a tamper and recompute the id so the claim looks self-consistent.
fn tamper(mut claim: Claim, how: &Tamper) -> Claim {
    match how {
        Tamper::AppendContent(extra) => claim.content.push_str(extra),
        Tamper::BumpStake(delta) => claim.stake += delta,
        Tamper::ShiftTimestamp(delta) => {
            claim.created_at = rumorality_types::Timestamp::new(claim.created_at.as_millis() - delta)
        }
        Tamper::FlipSignature { index, mask } => claim.signature.0[*index] ^= mask,
        Tamper::SwapKey(key) => claim.public_key.0 = *key,
    }
    claim.id = claim_id(&claim.content, &claim.author_id, claim.created_at, claim.stake);
    claim
}

fn node(clock: Arc<NullClock>) -> RumorNode {
    let mesh = MemoryMesh::new();
    RumorNode::new(
        NodeConfig::manual(),
        Collaborators {
            store: Arc::new(MemoryStore::new()),
            clock,
            attestation: Arc::new(NullAttestation::new("fuzz-device")),
            transport: Arc::new(mesh.endpoint()),
            rendezvous: None,
        },
    )
    .unwrap()
}

async fn push(node: &RumorNode, peer: &IdentityId, claim: Claim, clock: &NullClock) {
    node.handle_transport_event(TransportEvent::Message {
        peer: peer.clone(),
        envelope: Envelope::new(peer.clone(), clock.now(), ReplicationMessage::NewClaim(claim)),
    })
    .await;
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn untampered_claim_is_accepted() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let clock = Arc::new(NullClock::default());
        let node = node(clock.clone());
        let peer = IdentityId::new("fuzz-peer-000001");
        let claim = signed_claim(&clock, 3);
        push(&node, &peer, claim.clone(), &clock).await;
        assert!(node.get_claim(&claim.id).await.is_some());
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tampered_claims_never_merge(how in arb_tamper(), seed in 1u8..=255) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (merged, feed_len) = rt.block_on(async {
            let clock = Arc::new(NullClock::default());
            let node = node(clock.clone());
            let peer = IdentityId::new("fuzz-peer-000001");
            let forged = tamper(signed_claim(&clock, seed), &how);
            let id = forged.id;
            push(&node, &peer, forged, &clock).await;
            (
                node.get_claim(&id).await.is_some(),
                node.feed(FeedFilter::All).await.len(),
            )
        });
        prop_assert!(!merged);
        prop_assert_eq!(feed_len, 0);
    }
}
