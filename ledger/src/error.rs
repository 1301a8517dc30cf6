use rumorality_identity::IdentityError;
use rumorality_store::StoreError;
use rumorality_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientBalance { .. } => ErrorKind::Economic,
            Self::Storage(e) => e.kind(),
            Self::Identity(e) => e.kind(),
        }
    }
}
