//! Peer-to-peer replication for Rumorality.
//!
//! Nodes share claims and votes by anti-entropy: each new session starts
//! with an exchange of known ids, after which both sides push what they
//! create. There is no global ordering or cross-peer locking; peers
//! converge eventually and may briefly disagree on seal outcomes.
//!
//! ## Module overview
//!
//! - [`transport`]: the transport collaborator trait and its events.
//! - [`mesh`]: in-process transport used by tests and simulations.
//! - [`rendezvous`]: discovery registry with TTL eviction.
//! - [`session`]: per-peer session state machine.
//! - [`validation`]: checks applied to every inbound record.
//! - [`replication`]: the sync/push protocol itself.

pub mod error;
pub mod mesh;
pub mod rendezvous;
pub mod replication;
pub mod session;
pub mod transport;
pub mod validation;

pub use error::NetworkError;
pub use mesh::{MemoryMesh, MeshTransport};
pub use rendezvous::{InMemoryRendezvous, Rendezvous, DEFAULT_RENDEZVOUS_TTL_MS};
pub use replication::{MergeReport, RejectedRecord, ReplicationOutcome, ReplicationProtocol};
pub use session::{Session, SessionState, SessionTable};
pub use transport::{Transport, TransportEvent};
pub use validation::{validate_claim, validate_vote, InboundRejection};
