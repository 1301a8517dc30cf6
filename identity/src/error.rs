use rumorality_store::StoreError;
use rumorality_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("stored identity {0} does not match its key material")]
    Inconsistent(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Inconsistent(_) => ErrorKind::Crypto,
            Self::Store(e) => e.kind(),
        }
    }
}
