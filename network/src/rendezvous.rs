//! Rendezvous: where peers announce themselves and discover each other.

use crate::NetworkError;
use rumorality_types::{Clock, IdentityId, Timestamp};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registrations older than this are evicted.
pub const DEFAULT_RENDEZVOUS_TTL_MS: u64 = 60_000;

/// External discovery service.
pub trait Rendezvous: Send + Sync {
    /// Register (or refresh) `id`; returns the number of active identities.
    fn register(&self, id: &IdentityId) -> Result<usize, NetworkError>;

    /// Identities registered within the TTL.
    fn list_active(&self) -> Result<Vec<IdentityId>, NetworkError>;
}

/// In-process rendezvous with TTL eviction, shared by every node of a
/// simulation or test.
pub struct InMemoryRendezvous {
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<IdentityId, Timestamp>>,
}

impl InMemoryRendezvous {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, DEFAULT_RENDEZVOUS_TTL_MS)
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn evict_and_list(&self, entries: &mut HashMap<IdentityId, Timestamp>) -> Vec<IdentityId> {
        let now = self.clock.now();
        let ttl = self.ttl_ms;
        entries.retain(|_, seen| !seen.has_expired(ttl, now));
        let mut ids: Vec<IdentityId> = entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Rendezvous for InMemoryRendezvous {
    fn register(&self, id: &IdentityId) -> Result<usize, NetworkError> {
        if id.as_str().is_empty() {
            return Err(NetworkError::Rendezvous("empty identity id".into()));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| NetworkError::Rendezvous("registry lock poisoned".into()))?;
        entries.insert(id.clone(), self.clock.now());
        Ok(self.evict_and_list(&mut entries).len())
    }

    fn list_active(&self) -> Result<Vec<IdentityId>, NetworkError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| NetworkError::Rendezvous("registry lock poisoned".into()))?;
        Ok(self.evict_and_list(&mut entries))
    }
}
