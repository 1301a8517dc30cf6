use rumorality_messages::CodecError;
use rumorality_types::{ErrorKind, IdentityId};
use thiserror::Error;

use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("transport not open")]
    NotOpen,

    #[error("peer {0} unreachable")]
    PeerUnreachable(IdentityId),

    #[error("no open session with {0}")]
    SessionNotOpen(IdentityId),

    #[error("session with {peer}: invalid transition {from} -> {to}")]
    InvalidTransition {
        peer: IdentityId,
        from: SessionState,
        to: SessionState,
    },

    #[error("rendezvous: {0}")]
    Rendezvous(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl NetworkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } => ErrorKind::State,
            Self::Rendezvous(_) => ErrorKind::Validation,
            Self::Codec(e) => e.kind(),
            _ => ErrorKind::Network,
        }
    }
}
