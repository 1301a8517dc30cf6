//! In-process transport.
//!
//! A [`MemoryMesh`] is a switchboard shared by several nodes in one
//! process. Each node takes a [`MeshTransport`] endpoint from it. Every
//! message is encoded to a wire frame by the sender and decoded on
//! delivery, so the codec is exercised exactly as on a real link.

use crate::transport::{Transport, TransportEvent};
use crate::NetworkError;
use rumorality_messages::{decode_frame, encode_frame, Envelope};
use rumorality_types::IdentityId;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

type Link = (IdentityId, IdentityId);

fn link(a: &IdentityId, b: &IdentityId) -> Link {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

#[derive(Default)]
struct MeshInner {
    endpoints: HashMap<IdentityId, mpsc::UnboundedSender<TransportEvent>>,
    links: BTreeSet<Link>,
    frames_delivered: u64,
}

impl MeshInner {
    fn notify(&self, id: &IdentityId, event: TransportEvent) {
        if let Some(tx) = self.endpoints.get(id) {
            // A dropped receiver means the node is gone; nothing to report.
            let _ = tx.send(event);
        }
    }

    fn peers_of(&self, id: &IdentityId) -> Vec<IdentityId> {
        self.links
            .iter()
            .filter_map(|(a, b)| {
                if a == id {
                    Some(b.clone())
                } else if b == id {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    fn deliver(&mut self, from: &IdentityId, to: &IdentityId, frame: &[u8]) -> Result<(), NetworkError> {
        if !self.links.contains(&link(from, to)) {
            return Err(NetworkError::SessionNotOpen(to.clone()));
        }
        let tx = self
            .endpoints
            .get(to)
            .ok_or_else(|| NetworkError::PeerUnreachable(to.clone()))?;
        let event = match decode_frame(frame) {
            Ok(envelope) => TransportEvent::Message {
                peer: from.clone(),
                envelope,
            },
            Err(e) => TransportEvent::Error {
                peer: Some(from.clone()),
                reason: e.to_string(),
            },
        };
        tx.send(event)
            .map_err(|_| NetworkError::PeerUnreachable(to.clone()))?;
        self.frames_delivered += 1;
        Ok(())
    }
}

/// Shared in-process switchboard. Cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryMesh {
    inner: Arc<Mutex<MeshInner>>,
}

impl MemoryMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, unopened endpoint on this mesh.
    pub fn endpoint(&self) -> MeshTransport {
        MeshTransport {
            mesh: self.clone(),
            local: Mutex::new(None),
        }
    }

    /// Identities with an open endpoint.
    pub fn members(&self) -> Result<Vec<IdentityId>, NetworkError> {
        let inner = self.lock()?;
        let mut ids: Vec<IdentityId> = inner.endpoints.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn is_linked(&self, a: &IdentityId, b: &IdentityId) -> Result<bool, NetworkError> {
        Ok(self.lock()?.links.contains(&link(a, b)))
    }

    /// Total frames handed to a receiver since the mesh was created.
    pub fn frames_delivered(&self) -> Result<u64, NetworkError> {
        Ok(self.lock()?.frames_delivered)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MeshInner>, NetworkError> {
        self.inner
            .lock()
            .map_err(|_| NetworkError::Transport("mesh lock poisoned".into()))
    }
}

/// One node's endpoint on a [`MemoryMesh`].
pub struct MeshTransport {
    mesh: MemoryMesh,
    local: Mutex<Option<IdentityId>>,
}

impl MeshTransport {
    fn local_id(&self) -> Result<IdentityId, NetworkError> {
        self.local
            .lock()
            .map_err(|_| NetworkError::Transport("endpoint lock poisoned".into()))?
            .clone()
            .ok_or(NetworkError::NotOpen)
    }
}

impl Transport for MeshTransport {
    fn open(
        &self,
        local_id: &IdentityId,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, NetworkError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.mesh.lock()?;
        if inner.endpoints.contains_key(local_id) {
            return Err(NetworkError::Transport(format!(
                "{local_id} already open on this mesh"
            )));
        }
        tx.send(TransportEvent::Opened)
            .map_err(|_| NetworkError::Transport("receiver dropped".into()))?;
        inner.endpoints.insert(local_id.clone(), tx);
        *self
            .local
            .lock()
            .map_err(|_| NetworkError::Transport("endpoint lock poisoned".into()))? =
            Some(local_id.clone());
        tracing::debug!(node = %local_id.short(), "mesh endpoint opened");
        Ok(rx)
    }

    fn dial(&self, peer: &IdentityId) -> Result<(), NetworkError> {
        let local = self.local_id()?;
        if &local == peer {
            return Err(NetworkError::PeerUnreachable(peer.clone()));
        }
        let mut inner = self.mesh.lock()?;
        if !inner.endpoints.contains_key(peer) {
            return Err(NetworkError::PeerUnreachable(peer.clone()));
        }
        if inner.links.insert(link(&local, peer)) {
            inner.notify(peer, TransportEvent::PeerConnected(local.clone()));
        }
        inner.notify(&local, TransportEvent::PeerConnected(peer.clone()));
        Ok(())
    }

    fn send(&self, peer: &IdentityId, envelope: &Envelope) -> Result<(), NetworkError> {
        let local = self.local_id()?;
        let frame = encode_frame(envelope)?;
        self.mesh.lock()?.deliver(&local, peer, &frame)
    }

    fn broadcast(&self, envelope: &Envelope) -> Result<usize, NetworkError> {
        let local = self.local_id()?;
        let frame = encode_frame(envelope)?;
        let mut inner = self.mesh.lock()?;
        let mut reached = 0;
        for peer in inner.peers_of(&local) {
            match inner.deliver(&local, &peer, &frame) {
                Ok(()) => reached += 1,
                Err(e) => tracing::debug!(peer = %peer.short(), error = %e, "broadcast skipped peer"),
            }
        }
        Ok(reached)
    }

    fn disconnect(&self, peer: &IdentityId) -> Result<(), NetworkError> {
        let local = self.local_id()?;
        let mut inner = self.mesh.lock()?;
        if inner.links.remove(&link(&local, peer)) {
            inner.notify(peer, TransportEvent::PeerDisconnected(local.clone()));
            inner.notify(&local, TransportEvent::PeerDisconnected(peer.clone()));
        }
        Ok(())
    }

    fn close(&self) {
        let Ok(local) = self.local_id() else {
            return;
        };
        let Ok(mut inner) = self.mesh.lock() else {
            return;
        };
        for peer in inner.peers_of(&local) {
            inner.links.remove(&link(&local, &peer));
            inner.notify(&peer, TransportEvent::PeerDisconnected(local.clone()));
        }
        inner.endpoints.remove(&local);
        drop(inner);
        if let Ok(mut slot) = self.local.lock() {
            *slot = None;
        }
        tracing::debug!(node = %local.short(), "mesh endpoint closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumorality_messages::ReplicationMessage;
    use rumorality_types::Timestamp;

    fn id(s: &str) -> IdentityId {
        IdentityId::new(s)
    }

    fn sync_request(sender: &str) -> Envelope {
        Envelope::new(
            id(sender),
            Timestamp::new(1),
            ReplicationMessage::SyncRequest {
                known_claim_ids: vec![],
                known_vote_ids: vec![],
            },
        )
    }

    #[test]
    fn open_emits_opened_first() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let mut rx = a.open(&id("a")).unwrap();
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Opened);
    }

    #[test]
    fn opening_the_same_id_twice_fails() {
        let mesh = MemoryMesh::new();
        let _rx = mesh.endpoint().open(&id("a")).unwrap();
        assert!(mesh.endpoint().open(&id("a")).is_err());
    }

    #[test]
    fn dial_notifies_both_sides() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let b = mesh.endpoint();
        let mut rx_a = a.open(&id("a")).unwrap();
        let mut rx_b = b.open(&id("b")).unwrap();
        rx_a.try_recv().unwrap();
        rx_b.try_recv().unwrap();

        a.dial(&id("b")).unwrap();
        assert_eq!(rx_a.try_recv().unwrap(), TransportEvent::PeerConnected(id("b")));
        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::PeerConnected(id("a")));
        assert!(mesh.is_linked(&id("a"), &id("b")).unwrap());
    }

    #[test]
    fn dial_unknown_peer_is_unreachable() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let _rx = a.open(&id("a")).unwrap();
        assert!(matches!(
            a.dial(&id("zz")),
            Err(NetworkError::PeerUnreachable(_))
        ));
    }

    #[test]
    fn send_crosses_the_codec_in_order() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let b = mesh.endpoint();
        let _rx_a = a.open(&id("a")).unwrap();
        let mut rx_b = b.open(&id("b")).unwrap();
        a.dial(&id("b")).unwrap();
        rx_b.try_recv().unwrap();
        rx_b.try_recv().unwrap();

        a.send(&id("b"), &sync_request("a")).unwrap();
        a.send(&id("b"), &sync_request("a")).unwrap();
        for _ in 0..2 {
            match rx_b.try_recv().unwrap() {
                TransportEvent::Message { peer, envelope } => {
                    assert_eq!(peer, id("a"));
                    assert_eq!(envelope, sync_request("a"));
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(mesh.frames_delivered().unwrap(), 2);
    }

    #[test]
    fn send_without_link_fails() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let b = mesh.endpoint();
        let _rx_a = a.open(&id("a")).unwrap();
        let _rx_b = b.open(&id("b")).unwrap();
        assert!(matches!(
            a.send(&id("b"), &sync_request("a")),
            Err(NetworkError::SessionNotOpen(_))
        ));
    }

    #[test]
    fn broadcast_reaches_linked_peers_only() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let b = mesh.endpoint();
        let c = mesh.endpoint();
        let _rx_a = a.open(&id("a")).unwrap();
        let _rx_b = b.open(&id("b")).unwrap();
        let _rx_c = c.open(&id("c")).unwrap();
        a.dial(&id("b")).unwrap();
        assert_eq!(a.broadcast(&sync_request("a")).unwrap(), 1);
    }

    #[test]
    fn close_disconnects_peers_and_leaves_mesh() {
        let mesh = MemoryMesh::new();
        let a = mesh.endpoint();
        let b = mesh.endpoint();
        let _rx_a = a.open(&id("a")).unwrap();
        let mut rx_b = b.open(&id("b")).unwrap();
        a.dial(&id("b")).unwrap();
        rx_b.try_recv().unwrap();
        rx_b.try_recv().unwrap();

        a.close();
        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::PeerDisconnected(id("a")));
        assert_eq!(mesh.members().unwrap(), vec![id("b")]);
        assert!(matches!(a.dial(&id("b")), Err(NetworkError::NotOpen)));
    }
}
