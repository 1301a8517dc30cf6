use rumorality_ledger::LedgerError;
use rumorality_store::StoreError;
use rumorality_types::{ClaimId, ErrorKind, IdentityId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("claim content cannot be empty")]
    EmptyContent,

    #[error("claim too long: {len} characters, max {max}")]
    ContentTooLong { len: usize, max: usize },

    #[error("stake {stake} is below the minimum post stake {min}")]
    StakeBelowMinimum { stake: u64, min: u64 },

    #[error("insufficient stake: need {needed}, have {available}")]
    InsufficientStake { needed: u64, available: u64 },

    #[error("claim not found: {0}")]
    NotFound(ClaimId),

    #[error("claim {0} is sealed")]
    Sealed(ClaimId),

    #[error("{requester} is not the author of claim {claim}")]
    Unauthorized { claim: ClaimId, requester: IdentityId },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ClaimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyContent | Self::ContentTooLong { .. } | Self::StakeBelowMinimum { .. } => {
                ErrorKind::Validation
            }
            Self::InsufficientStake { .. } => ErrorKind::Economic,
            Self::NotFound(_) | Self::Sealed(_) => ErrorKind::State,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Ledger(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }
}
