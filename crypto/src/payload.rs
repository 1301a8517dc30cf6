//! Canonical signing payloads.
//!
//! Fixed-width integers are little-endian; variable-length strings are
//! prefixed with their byte length as a little-endian `u64`.

use rumorality_types::{ClaimId, Direction, Timestamp};

pub(crate) fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Bytes an author signs for a claim: `(content, timestamp, stake)`.
pub fn claim_signing_payload(content: &str, timestamp: Timestamp, stake: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(content.len() + 24);
    put_str(&mut buf, content);
    buf.extend_from_slice(&timestamp.as_millis().to_le_bytes());
    buf.extend_from_slice(&stake.to_le_bytes());
    buf
}

/// Bytes a voter signs: `(claim_id, direction, stake, timestamp)`.
pub fn vote_signing_payload(
    claim_id: &ClaimId,
    direction: Direction,
    stake: u64,
    timestamp: Timestamp,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 1 + 16);
    buf.extend_from_slice(claim_id.as_bytes());
    buf.push(direction.as_byte());
    buf.extend_from_slice(&stake.to_le_bytes());
    buf.extend_from_slice(&timestamp.as_millis().to_le_bytes());
    buf
}
