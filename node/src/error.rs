use rumorality_claims::ClaimError;
use rumorality_consensus::ConsensusError;
use rumorality_ledger::LedgerError;
use rumorality_network::NetworkError;
use rumorality_store::StoreError;
use rumorality_types::{ErrorKind, ParamsError};
use rumorality_voting::VotingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Voting(#[from] VotingError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("node already started")]
    AlreadyStarted,
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Claim(e) => e.kind(),
            Self::Voting(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Consensus(e) => e.kind(),
            Self::Network(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Params(_) | Self::Config(_) | Self::Metrics(_) => ErrorKind::Validation,
            Self::AlreadyStarted => ErrorKind::State,
        }
    }
}
