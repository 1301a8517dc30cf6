use rumorality_claims::ClaimError;
use rumorality_ledger::LedgerError;
use rumorality_store::StoreError;
use rumorality_types::{ClaimId, ErrorKind, IdentityId, ParseDirectionError, VoteId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error(transparent)]
    InvalidDirection(#[from] ParseDirectionError),

    #[error("vote count must be at least 1")]
    InvalidVoteCount,

    #[error("{voter} already voted on claim {claim}")]
    AlreadyVoted { claim: ClaimId, voter: IdentityId },

    #[error("claim not found: {0}")]
    NotFound(ClaimId),

    #[error("claim {0} is sealed")]
    Sealed(ClaimId),

    #[error("new accounts cannot vote on trending claim {0}")]
    NewAccountCooldown(ClaimId),

    #[error("this device already voted on claim {0}")]
    DeviceAlreadyVoted(ClaimId),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("vote {0} already known")]
    DuplicateVote(VoteId),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl VotingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDirection(_) | Self::InvalidVoteCount => ErrorKind::Validation,
            Self::AlreadyVoted { .. }
            | Self::NotFound(_)
            | Self::Sealed(_)
            | Self::DuplicateVote(_) => ErrorKind::State,
            Self::NewAccountCooldown(_) | Self::DeviceAlreadyVoted(_) => ErrorKind::SybilDefense,
            Self::InsufficientBalance { .. } => ErrorKind::Economic,
            Self::Claim(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }
}
