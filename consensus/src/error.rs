use rumorality_claims::ClaimError;
use rumorality_ledger::LedgerError;
use rumorality_types::{ClaimId, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("claim not found: {0}")]
    NotFound(ClaimId),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ConsensusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::State,
            Self::Claim(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
        }
    }
}
