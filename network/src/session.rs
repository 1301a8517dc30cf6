//! Per-peer session state machine.

use crate::NetworkError;
use rumorality_types::{IdentityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Lifecycle of a session with one peer.
///
/// ```text
/// Idle ──dial──▶ Connecting ──connected──▶ Open ──▶ Closed | Errored
///   └────────────inbound connect──────────▶ Open
/// ```
///
/// Closed and Errored sessions may be dialed again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Idle, Open)
                | (Connecting, Open)
                | (Connecting, Closed)
                | (Connecting, Errored)
                | (Open, Closed)
                | (Open, Errored)
                | (Closed, Connecting)
                | (Closed, Open)
                | (Errored, Connecting)
                | (Errored, Open)
        )
    }

    /// Connecting or open: a dial would be redundant.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        })
    }
}

/// Metadata tracked for each peer we have ever dialed or heard from.
#[derive(Clone, Debug)]
pub struct Session {
    pub peer: IdentityId,
    pub state: SessionState,
    pub since: Timestamp,
    /// Set when the initial sync response from this peer has been applied.
    pub synced: bool,
}

// ---------------------------------------------------------------------------
// Session table
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<IdentityId, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the session with `peer`; unknown peers are idle.
    pub fn state(&self, peer: &IdentityId) -> SessionState {
        self.sessions
            .get(peer)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn get(&self, peer: &IdentityId) -> Option<&Session> {
        self.sessions.get(peer)
    }

    /// Move the session with `peer` to `next`, returning the previous state.
    pub fn transition(
        &mut self,
        peer: &IdentityId,
        next: SessionState,
        now: Timestamp,
    ) -> Result<SessionState, NetworkError> {
        let session = self
            .sessions
            .entry(peer.clone())
            .or_insert_with(|| Session {
                peer: peer.clone(),
                state: SessionState::Idle,
                since: now,
                synced: false,
            });
        let prev = session.state;
        if !prev.can_transition_to(next) {
            return Err(NetworkError::InvalidTransition {
                peer: peer.clone(),
                from: prev,
                to: next,
            });
        }
        session.state = next;
        session.since = now;
        if next != SessionState::Open {
            session.synced = false;
        }
        tracing::debug!(peer = %peer.short(), from = %prev, to = %next, "session transition");
        Ok(prev)
    }

    pub fn mark_synced(&mut self, peer: &IdentityId) {
        if let Some(session) = self.sessions.get_mut(peer) {
            session.synced = true;
        }
    }

    /// Peers with an open session, sorted for deterministic fan-out.
    pub fn open_peers(&self) -> Vec<IdentityId> {
        let mut peers: Vec<IdentityId> = self
            .sessions
            .values()
            .filter(|s| s.state == SessionState::Open)
            .map(|s| s.peer.clone())
            .collect();
        peers.sort();
        peers
    }

    pub fn open_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state == SessionState::Open)
            .count()
    }

    /// Close every live session; returns how many were closed.
    pub fn close_all(&mut self, now: Timestamp) -> usize {
        let mut closed = 0;
        for session in self.sessions.values_mut() {
            if session.state.is_live() {
                session.state = SessionState::Closed;
                session.since = now;
                session.synced = false;
                closed += 1;
            }
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(s: &str) -> IdentityId {
        IdentityId::new(s)
    }

    #[test]
    fn unknown_peer_is_idle() {
        let table = SessionTable::new();
        assert_eq!(table.state(&peer("a")), SessionState::Idle);
    }

    #[test]
    fn dial_then_connect_opens() {
        let mut table = SessionTable::new();
        let now = Timestamp::new(1);
        table.transition(&peer("a"), SessionState::Connecting, now).unwrap();
        table.transition(&peer("a"), SessionState::Open, now).unwrap();
        assert_eq!(table.open_peers(), vec![peer("a")]);
        assert_eq!(table.open_count(), 1);
    }

    #[test]
    fn inbound_connection_opens_from_idle() {
        let mut table = SessionTable::new();
        let prev = table
            .transition(&peer("b"), SessionState::Open, Timestamp::new(1))
            .unwrap();
        assert_eq!(prev, SessionState::Idle);
    }

    #[test]
    fn closed_cannot_jump_to_errored() {
        let mut table = SessionTable::new();
        let now = Timestamp::new(1);
        table.transition(&peer("a"), SessionState::Open, now).unwrap();
        table.transition(&peer("a"), SessionState::Closed, now).unwrap();
        let err = table
            .transition(&peer("a"), SessionState::Errored, now)
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidTransition { .. }));
        // Redial is allowed.
        table.transition(&peer("a"), SessionState::Connecting, now).unwrap();
    }

    #[test]
    fn leaving_open_clears_synced_flag() {
        let mut table = SessionTable::new();
        let now = Timestamp::new(1);
        table.transition(&peer("a"), SessionState::Open, now).unwrap();
        table.mark_synced(&peer("a"));
        assert!(table.get(&peer("a")).unwrap().synced);
        table.transition(&peer("a"), SessionState::Closed, now).unwrap();
        assert!(!table.get(&peer("a")).unwrap().synced);
    }

    #[test]
    fn close_all_only_touches_live_sessions() {
        let mut table = SessionTable::new();
        let now = Timestamp::new(1);
        table.transition(&peer("a"), SessionState::Open, now).unwrap();
        table.transition(&peer("b"), SessionState::Connecting, now).unwrap();
        table.transition(&peer("c"), SessionState::Open, now).unwrap();
        table.transition(&peer("c"), SessionState::Errored, now).unwrap();
        assert_eq!(table.close_all(Timestamp::new(2)), 2);
        assert_eq!(table.state(&peer("c")), SessionState::Errored);
        assert_eq!(table.open_count(), 0);
    }
}
