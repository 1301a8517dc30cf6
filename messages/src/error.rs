use rumorality_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("truncated frame: header says {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("protocol version mismatch: ours {ours}, theirs {theirs}")]
    VersionMismatch { ours: u16, theirs: u16 },
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Network
    }
}
