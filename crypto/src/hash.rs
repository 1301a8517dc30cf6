//! Blake2b-256 hashing and content-derived ids.

use crate::payload::put_str;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use rumorality_types::{ClaimId, Direction, IdentityId, PublicKey, Timestamp, VoteId};

type Blake2b256 = Blake2b<U32>;

/// Prefix of a tombstoned claim's content.
pub const TOMBSTONE_PREFIX: &str = "[DELETED] ";

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash several byte slices in sequence without concatenating them.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Identity id: the first 8 bytes of Blake2b-256(public key), hex-encoded.
pub fn derive_identity_id(public_key: &PublicKey) -> IdentityId {
    let digest = blake2b_256(public_key.as_bytes());
    IdentityId::new(hex::encode(&digest[..8]))
}

/// Claim id over `(content, author_id, timestamp, stake)`.
pub fn claim_id(content: &str, author_id: &IdentityId, timestamp: Timestamp, stake: u64) -> ClaimId {
    let mut buf = Vec::with_capacity(content.len() + 48);
    put_str(&mut buf, content);
    put_str(&mut buf, author_id.as_str());
    buf.extend_from_slice(&timestamp.as_millis().to_le_bytes());
    buf.extend_from_slice(&stake.to_le_bytes());
    ClaimId::new(blake2b_256(&buf))
}

/// Vote id over every field of the vote record except its signature.
#[allow(clippy::too_many_arguments)]
pub fn vote_id(
    claim_id: &ClaimId,
    voter_id: &IdentityId,
    direction: Direction,
    stake: u64,
    weight: f64,
    reputation_snapshot: u64,
    timestamp: Timestamp,
    device_attestation: &str,
    network_attestation: Option<&str>,
) -> VoteId {
    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(claim_id.as_bytes());
    put_str(&mut buf, voter_id.as_str());
    buf.push(direction.as_byte());
    buf.extend_from_slice(&stake.to_le_bytes());
    buf.extend_from_slice(&weight.to_bits().to_le_bytes());
    buf.extend_from_slice(&reputation_snapshot.to_le_bytes());
    buf.extend_from_slice(&timestamp.as_millis().to_le_bytes());
    put_str(&mut buf, device_attestation);
    match network_attestation {
        Some(net) => {
            buf.push(1);
            put_str(&mut buf, net);
        }
        None => buf.push(0),
    }
    VoteId::new(blake2b_256(&buf))
}

/// One-way replacement for deleted claim content.
pub fn tombstone_digest(content: &str) -> String {
    let digest = blake2b_256(content.as_bytes());
    format!("{TOMBSTONE_PREFIX}{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn identity_id_is_well_formed_and_stable() {
        let kp = keypair_from_seed(&[5u8; 32]);
        let id = derive_identity_id(&kp.public);
        assert!(id.is_well_formed());
        assert_eq!(id, derive_identity_id(&kp.public));
    }

    #[test]
    fn claim_id_covers_every_field() {
        let author = IdentityId::from("00112233aabbccdd");
        let base = claim_id("x", &author, Timestamp::new(1), 10);
        assert_ne!(base, claim_id("y", &author, Timestamp::new(1), 10));
        assert_ne!(base, claim_id("x", &IdentityId::from("ffffffffffffffff"), Timestamp::new(1), 10));
        assert_ne!(base, claim_id("x", &author, Timestamp::new(2), 10));
        assert_ne!(base, claim_id("x", &author, Timestamp::new(1), 11));
    }

    #[test]
    fn vote_id_depends_on_network_attestation() {
        let claim = ClaimId::new([9u8; 32]);
        let voter = IdentityId::from("00112233aabbccdd");
        let t = Timestamp::new(5);
        let a = vote_id(&claim, &voter, Direction::True, 4, 2.0, 100, t, "dev", None);
        let b = vote_id(&claim, &voter, Direction::True, 4, 2.0, 100, t, "dev", Some(""));
        assert_ne!(a, b);
    }

    #[test]
    fn tombstone_hides_content() {
        let digest = tombstone_digest("secret rumor");
        assert!(digest.starts_with(TOMBSTONE_PREFIX));
        assert!(!digest.contains("secret"));
        assert_eq!(digest.len(), TOMBSTONE_PREFIX.len() + 16);
    }
}
