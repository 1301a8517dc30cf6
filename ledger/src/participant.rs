//! A local participant: an identity together with its reputation account.

use crate::{LedgerError, ReputationAccount, ReputationLedger};
use rumorality_identity::IdentityService;
use rumorality_store::RecordStore;
use rumorality_types::{AttestationProvider, Clock, IdentityId, RumorParams};
use std::sync::Arc;

pub struct Participant {
    pub identity: IdentityService,
    pub ledger: ReputationLedger,
}

impl Participant {
    /// Pair an identity with a fresh in-memory account.
    pub fn new(identity: IdentityService, params: RumorParams) -> Self {
        let ledger = ReputationLedger::new(identity.id().clone(), params, identity.clock().clone());
        Self { identity, ledger }
    }

    /// Load (or create) the persisted identity and its account.
    pub fn load(
        store: &dyn RecordStore,
        params: RumorParams,
        clock: Arc<dyn Clock>,
        attestation: &dyn AttestationProvider,
    ) -> Result<Self, LedgerError> {
        let identity = IdentityService::load_or_generate(store, &params, clock.clone(), attestation)?;
        let ledger = ReputationLedger::init(store, identity.id(), params, clock)?;
        Ok(Self { identity, ledger })
    }

    pub fn id(&self) -> &IdentityId {
        self.identity.id()
    }

    pub fn persist(&self, store: &dyn RecordStore) -> Result<(), LedgerError> {
        self.ledger.persist(store)
    }

    /// Undo every balance change since `checkpoint` after a later write
    /// failed, and rewrite the account record in case it was already stored.
    pub fn roll_back(&mut self, checkpoint: ReputationAccount, store: &dyn RecordStore) {
        self.ledger.restore(checkpoint);
        if let Err(e) = self.persist(store) {
            tracing::warn!(identity = %self.id(), error = %e, "account record left ahead of memory");
        }
    }

    pub fn credibility_score(&self) -> u32 {
        self.ledger.credibility_score(&self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumorality_nullables::{NullAttestation, NullClock, NullStore};

    #[test]
    fn load_is_stable_across_restarts() {
        let store = NullStore::new();
        let clock = Arc::new(NullClock::default());
        let att = NullAttestation::new("dev");

        let mut first = Participant::load(&store, RumorParams::default(), clock.clone(), &att).unwrap();
        first.ledger.stake(15, None).unwrap();
        first.persist(&store).unwrap();

        let second = Participant::load(&store, RumorParams::default(), clock, &att).unwrap();
        assert_eq!(second.id(), first.id());
        assert_eq!(second.ledger.balance(), 85);
    }

    #[test]
    fn roll_back_rewrites_the_stored_account() {
        let store = NullStore::new();
        let clock = Arc::new(NullClock::default());
        let att = NullAttestation::new("dev");

        let mut p = Participant::load(&store, RumorParams::default(), clock.clone(), &att).unwrap();
        let checkpoint = p.ledger.account().clone();
        p.ledger.stake(40, None).unwrap();
        p.persist(&store).unwrap();
        p.roll_back(checkpoint, &store);
        assert_eq!(p.ledger.balance(), 100);

        let reloaded = Participant::load(&store, RumorParams::default(), clock, &att).unwrap();
        assert_eq!(reloaded.ledger.balance(), 100);
    }
}
