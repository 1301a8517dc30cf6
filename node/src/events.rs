//! Domain events emitted by the node for subscribers (presentation layers,
//! metrics exporters, tests).

use rumorality_consensus::SealTrigger;
use rumorality_network::InboundRejection;
use rumorality_types::{ClaimId, Direction, IdentityId, Outcome, VoteId};
use std::sync::RwLock;

#[derive(Clone, Debug, PartialEq)]
pub enum CoreEvent {
    /// A claim was posted locally.
    ClaimPosted { claim: ClaimId, author: IdentityId, stake: u64 },
    /// A claim authored elsewhere was merged from a peer.
    ClaimReceived { claim: ClaimId, author: IdentityId },
    ClaimDeleted { claim: ClaimId },
    /// A vote entered a tally, locally cast or merged from a peer.
    VoteRecorded {
        claim: ClaimId,
        vote: VoteId,
        voter: IdentityId,
        direction: Direction,
        weight: f64,
        remote: bool,
    },
    ClaimSealed {
        claim: ClaimId,
        outcome: Outcome,
        trigger: SealTrigger,
    },
    /// Settlement credited the local account.
    SettlementApplied { claim: ClaimId, credited: u64 },
    ReputationDecayed { amount: u64, balance: u64 },
    PeerConnected { peer: IdentityId },
    PeerDisconnected { peer: IdentityId },
    /// A sync response from `peer` was merged.
    PeerSynced {
        peer: IdentityId,
        claims: usize,
        votes: usize,
    },
    InboundRejected {
        peer: IdentityId,
        record: Option<String>,
        reason: InboundRejection,
    },
}

type Listener = Box<dyn Fn(&CoreEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting task, usually while the node's
/// state lock is released; keep them fast.
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&CoreEvent) + Send + Sync + 'static) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(Box::new(listener)),
            Err(_) => tracing::error!("event bus poisoned, listener dropped"),
        }
    }

    pub fn emit(&self, event: &CoreEvent) {
        let Ok(listeners) = self.listeners.read() else {
            tracing::error!("event bus poisoned, event dropped");
            return;
        };
        for listener in listeners.iter() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
