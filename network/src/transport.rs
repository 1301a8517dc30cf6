//! The transport collaborator.
//!
//! A transport connects identities, not addresses: peers are dialed by
//! their identity id. Delivery is reliable and ordered per peer, with no
//! ordering guarantee across distinct peers. Sends are fire-and-forget.

use crate::NetworkError;
use rumorality_messages::Envelope;
use rumorality_types::IdentityId;
use tokio::sync::mpsc;

/// Everything a transport reports back to its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The local endpoint is up.
    Opened,
    PeerConnected(IdentityId),
    PeerDisconnected(IdentityId),
    Message {
        peer: IdentityId,
        envelope: Envelope,
    },
    Error {
        peer: Option<IdentityId>,
        reason: String,
    },
}

pub trait Transport: Send + Sync {
    /// Bring the local endpoint up as `local_id`. The returned receiver
    /// yields [`TransportEvent::Opened`] first.
    fn open(
        &self,
        local_id: &IdentityId,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, NetworkError>;

    /// Connect to `peer`. Both sides observe `PeerConnected`.
    fn dial(&self, peer: &IdentityId) -> Result<(), NetworkError>;

    fn send(&self, peer: &IdentityId, envelope: &Envelope) -> Result<(), NetworkError>;

    /// Send to every connected peer; returns how many were reached.
    fn broadcast(&self, envelope: &Envelope) -> Result<usize, NetworkError>;

    fn disconnect(&self, peer: &IdentityId) -> Result<(), NetworkError>;

    /// Drop every connection and take the endpoint down. In-flight
    /// messages are not awaited.
    fn close(&self);
}
