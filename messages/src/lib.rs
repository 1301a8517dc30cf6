//! Replication messages exchanged between Rumorality peers.
//!
//! Every message travels inside an [`Envelope`] carrying a
//! [`MessageHeader`], framed on the wire as a big-endian `u32` length
//! followed by the bincode body.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode_frame, encode_frame, sync_responses, MAX_FRAME_SIZE, SYNC_CHUNK_BUDGET};
pub use error::CodecError;
pub use message::{Envelope, MessageHeader, MessageType, ReplicationMessage, PROTOCOL_VERSION};
