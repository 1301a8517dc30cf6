use rumorality_crypto::{
    claim_id, claim_signing_payload, derive_identity_id, keypair_from_seed, sign_message,
    verify_signature,
};
use rumorality_messages::{
    decode_frame, encode_frame, sync_responses, CodecError, Envelope, MessageType,
    ReplicationMessage, MAX_FRAME_SIZE, SYNC_CHUNK_BUDGET,
};
use rumorality_types::{Claim, ClaimId, Direction, IdentityId, Tally, Timestamp, Vote, VoteId};

fn signed_claim() -> Claim {
    let kp = keypair_from_seed(&[11; 32]);
    let author = derive_identity_id(&kp.public);
    let ts = Timestamp::new(1_700_000_000_000);
    let content = "ferry service resumes monday";
    Claim {
        id: claim_id(content, &author, ts, 10),
        content: content.to_string(),
        author_id: author,
        created_at: ts,
        expires_at: ts.plus_millis(1_000),
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

#[test]
fn signed_claim_survives_the_wire() {
    let claim = signed_claim();
    let env = Envelope::new(claim.author_id.clone(), claim.created_at, ReplicationMessage::NewClaim(claim.clone()));
    let decoded = decode_frame(&encode_frame(&env).unwrap()).unwrap();

    assert_eq!(decoded.message.message_type(), MessageType::NewClaim);
    let ReplicationMessage::NewClaim(received) = decoded.message else {
        panic!("expected a claim");
    };
    assert_eq!(received, claim);
    let payload = claim_signing_payload(&received.content, received.created_at, received.stake);
    assert!(verify_signature(&payload, &received.signature, &received.public_key));
}

#[test]
fn sync_response_preserves_order() {
    let a = signed_claim();
    let mut b = signed_claim();
    b.stake = 20;
    let env = Envelope::new(
        a.author_id.clone(),
        Timestamp::new(1),
        ReplicationMessage::SyncResponse { claims: vec![a.clone(), b.clone()], votes: vec![] },
    );
    let decoded = decode_frame(&encode_frame(&env).unwrap()).unwrap();
    match decoded.message {
        ReplicationMessage::SyncResponse { claims, votes } => {
            assert_eq!(claims, vec![a, b]);
            assert!(votes.is_empty());
        }
        other => panic!("unexpected {:?}", other.message_type()),
    }
}

fn backlog_vote(n: u32, claim: &Claim) -> Vote {
    let mut id = [0u8; 32];
    id[..4].copy_from_slice(&n.to_be_bytes());
    Vote {
        id: VoteId::new(id),
        claim_id: claim.id,
        voter_id: IdentityId::new(format!("{n:016x}")),
        direction: Direction::True,
        stake: 4,
        weight: 2.0,
        reputation_snapshot: 100,
        timestamp: Timestamp::new(u64::from(n)),
        device_attestation: format!("device-{n}"),
        network_attestation: None,
        signature: claim.signature,
        public_key: claim.public_key,
    }
}

#[test]
fn backlog_larger_than_a_frame_is_split_into_frames_that_fit() {
    let template = signed_claim();
    let content = "x".repeat(280);
    let claims: Vec<Claim> = (0..12_000u32)
        .map(|n| {
            let mut id = [0u8; 32];
            id[..4].copy_from_slice(&n.to_be_bytes());
            Claim {
                id: ClaimId::new(id),
                content: content.clone(),
                ..template.clone()
            }
        })
        .collect();
    let votes: Vec<Vote> = (0..500).map(|n| backlog_vote(n, &claims[n as usize])).collect();
    let sender = template.author_id.clone();

    let whole = Envelope::new(
        sender.clone(),
        Timestamp::new(1),
        ReplicationMessage::SyncResponse { claims: claims.clone(), votes: votes.clone() },
    );
    assert!(matches!(encode_frame(&whole), Err(CodecError::FrameTooLarge { .. })));

    let chunks = sync_responses(claims.clone(), votes.clone(), SYNC_CHUNK_BUDGET).unwrap();
    assert!(chunks.len() >= 2);

    let mut got_claims = Vec::new();
    let mut got_votes = Vec::new();
    for chunk in chunks {
        let frame = encode_frame(&Envelope::new(sender.clone(), Timestamp::new(1), chunk)).unwrap();
        assert!(frame.len() <= MAX_FRAME_SIZE + 4);
        let ReplicationMessage::SyncResponse { claims, votes } = decode_frame(&frame).unwrap().message else {
            panic!("expected a sync response");
        };
        // No claim ever follows a vote.
        assert!(claims.is_empty() || got_votes.is_empty());
        got_claims.extend(claims);
        got_votes.extend(votes);
    }
    assert_eq!(got_claims, claims);
    assert_eq!(got_votes, votes);
}

#[test]
fn empty_answer_is_one_empty_response() {
    let chunks = sync_responses(Vec::new(), Vec::new(), SYNC_CHUNK_BUDGET).unwrap();
    assert_eq!(
        chunks,
        vec![ReplicationMessage::SyncResponse { claims: vec![], votes: vec![] }]
    );
}

#[test]
fn oversized_record_travels_alone() {
    let a = signed_claim();
    let mut b = signed_claim();
    b.stake = 20;
    let chunks = sync_responses(vec![a, b], Vec::new(), 1).unwrap();
    assert_eq!(chunks.len(), 2);
}
