use rumorality_types::{Claim, ClaimId, IdentityId, Timestamp, Vote, VoteId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bumped whenever the message layout changes incompatibly.
pub const PROTOCOL_VERSION: u16 = 1;

/// Header present on every replication message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub protocol_version: u16,
    pub sender: IdentityId,
    pub timestamp: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    SyncRequest,
    SyncResponse,
    NewClaim,
    NewVote,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SyncRequest => "sync_request",
            Self::SyncResponse => "sync_response",
            Self::NewClaim => "new_claim",
            Self::NewVote => "new_vote",
        })
    }
}

/// Anti-entropy and push messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReplicationMessage {
    /// Sent on session open: everything the sender already holds.
    SyncRequest {
        known_claim_ids: Vec<ClaimId>,
        known_vote_ids: Vec<VoteId>,
    },
    /// Only the items missing from the request's id lists.
    SyncResponse { claims: Vec<Claim>, votes: Vec<Vote> },
    /// A locally created claim, pushed to every open session.
    NewClaim(Claim),
    /// A locally cast vote, pushed to every open session.
    NewVote(Vote),
}

impl ReplicationMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::SyncRequest { .. } => MessageType::SyncRequest,
            Self::SyncResponse { .. } => MessageType::SyncResponse,
            Self::NewClaim(_) => MessageType::NewClaim,
            Self::NewVote(_) => MessageType::NewVote,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: MessageHeader,
    pub message: ReplicationMessage,
}

impl Envelope {
    pub fn new(sender: IdentityId, timestamp: Timestamp, message: ReplicationMessage) -> Self {
        Self {
            header: MessageHeader {
                protocol_version: PROTOCOL_VERSION,
                sender,
                timestamp,
            },
            message,
        }
    }
}
