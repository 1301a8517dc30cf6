use rumorality_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Crypto
    }
}
