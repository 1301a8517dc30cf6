//! Length-prefixed bincode framing.

use crate::message::{Envelope, ReplicationMessage, PROTOCOL_VERSION};
use crate::CodecError;
use rumorality_types::{Claim, Vote};
use serde::Serialize;

/// Upper bound on a frame body. A sync answer carrying a large backlog is
/// split with [`sync_responses`].
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Record bytes allowed in one `SyncResponse`, leaving room for the
/// envelope header and the message's own framing.
pub const SYNC_CHUNK_BUDGET: usize = MAX_FRAME_SIZE - 4 * 1024;

const LEN_PREFIX: usize = 4;

pub fn encode_frame(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let body = bincode::serialize(envelope).map_err(|e| CodecError::Encode(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let mut frame = Vec::with_capacity(LEN_PREFIX + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Pack a sync answer into `SyncResponse` messages whose records take at
/// most `budget` encoded bytes each.
///
/// Every claim is placed before any vote, so a receiver reading the chunks
/// in order always holds a vote's claim first. A single record larger than
/// the budget travels alone. Always yields at least one response, empty
/// when there is nothing to send.
pub fn sync_responses(
    claims: Vec<Claim>,
    votes: Vec<Vote>,
    budget: usize,
) -> Result<Vec<ReplicationMessage>, CodecError> {
    let mut chunker = Chunker::new(budget);
    for claim in claims {
        let size = encoded_size(&claim)?;
        chunker.make_room(size);
        chunker.claims.push(claim);
    }
    for vote in votes {
        let size = encoded_size(&vote)?;
        chunker.make_room(size);
        chunker.votes.push(vote);
    }
    Ok(chunker.finish())
}

struct Chunker {
    budget: usize,
    used: usize,
    claims: Vec<Claim>,
    votes: Vec<Vote>,
    done: Vec<ReplicationMessage>,
}

impl Chunker {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            used: 0,
            claims: Vec::new(),
            votes: Vec::new(),
            done: Vec::new(),
        }
    }

    /// Close the current chunk if `size` more bytes would overflow it.
    fn make_room(&mut self, size: usize) {
        let open = !self.claims.is_empty() || !self.votes.is_empty();
        if open && self.used.saturating_add(size) > self.budget {
            self.flush();
        }
        self.used = self.used.saturating_add(size);
    }

    fn flush(&mut self) {
        self.done.push(ReplicationMessage::SyncResponse {
            claims: std::mem::take(&mut self.claims),
            votes: std::mem::take(&mut self.votes),
        });
        self.used = 0;
    }

    fn finish(mut self) -> Vec<ReplicationMessage> {
        if !self.claims.is_empty() || !self.votes.is_empty() || self.done.is_empty() {
            self.flush();
        }
        self.done
    }
}

fn encoded_size<T: Serialize>(record: &T) -> Result<usize, CodecError> {
    bincode::serialized_size(record)
        .map(|n| n as usize)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode one complete frame. Rejects frames from other protocol versions.
pub fn decode_frame(frame: &[u8]) -> Result<Envelope, CodecError> {
    if frame.len() < LEN_PREFIX {
        return Err(CodecError::Truncated {
            expected: LEN_PREFIX,
            actual: frame.len(),
        });
    }
    let (len_bytes, body) = frame.split_at(LEN_PREFIX);
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }
    if body.len() != len {
        return Err(CodecError::Truncated {
            expected: len,
            actual: body.len(),
        });
    }
    let envelope: Envelope =
        bincode::deserialize(body).map_err(|e| CodecError::Decode(e.to_string()))?;
    if envelope.header.protocol_version != PROTOCOL_VERSION {
        return Err(CodecError::VersionMismatch {
            ours: PROTOCOL_VERSION,
            theirs: envelope.header.protocol_version,
        });
    }
    Ok(envelope)
}
