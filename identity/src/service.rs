//! The identity service: keypair, id, signing, and account age.

use crate::IdentityError;
use rumorality_crypto::{
    claim_signing_payload, derive_identity_id, generate_keypair, keypair_from_private,
    keypair_from_seed, sign_message, verify_signature, vote_signing_payload,
};
use rumorality_store::{get_record, put_record, Collection, RecordStore};
use rumorality_types::{
    AttestationProvider, ClaimId, Clock, Direction, IdentityId, KeyPair, PrivateKey, PublicKey,
    RumorParams, Signature, Timestamp, MILLIS_PER_DAY,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroize;

/// Key under which the local identity is stored.
const LOCAL_SLOT: &str = "local";

/// Public view of the local identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub id: IdentityId,
    pub public_key: PublicKey,
    pub created_at: Timestamp,
    pub device_attestation: String,
    pub network_attestation: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    id: IdentityId,
    public_key: PublicKey,
    private_key: [u8; 32],
    created_at: Timestamp,
    device_attestation: String,
}

impl Drop for StoredIdentity {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

pub struct IdentityService {
    identity: Identity,
    keys: KeyPair,
    cooldown_ms: u64,
    clock: Arc<dyn Clock>,
}

impl IdentityService {
    /// Create a fresh identity with a random keypair.
    pub fn generate(
        params: &RumorParams,
        clock: Arc<dyn Clock>,
        attestation: &dyn AttestationProvider,
    ) -> Self {
        Self::from_keys(generate_keypair(), params, clock, attestation)
    }

    /// Deterministic identity for tests and simulations.
    pub fn from_seed(
        seed: &[u8; 32],
        params: &RumorParams,
        clock: Arc<dyn Clock>,
        attestation: &dyn AttestationProvider,
    ) -> Self {
        Self::from_keys(keypair_from_seed(seed), params, clock, attestation)
    }

    fn from_keys(
        keys: KeyPair,
        params: &RumorParams,
        clock: Arc<dyn Clock>,
        attestation: &dyn AttestationProvider,
    ) -> Self {
        let identity = Identity {
            id: derive_identity_id(&keys.public),
            public_key: keys.public,
            created_at: clock.now(),
            device_attestation: attestation.device_attestation(),
            network_attestation: attestation.network_attestation(),
        };
        tracing::info!(identity = %identity.id, "generated new identity");
        Self {
            identity,
            keys,
            cooldown_ms: params.cooldown_ms(),
            clock,
        }
    }

    /// Reload the persisted identity, or generate and persist a new one.
    ///
    /// A stored identity whose device attestation no longer matches the
    /// current device is rebound to the current attestation and saved.
    pub fn load_or_generate(
        store: &dyn RecordStore,
        params: &RumorParams,
        clock: Arc<dyn Clock>,
        attestation: &dyn AttestationProvider,
    ) -> Result<Self, IdentityError> {
        let Some(mut stored) =
            get_record::<StoredIdentity>(store, Collection::Identity, LOCAL_SLOT)?
        else {
            let service = Self::generate(params, clock, attestation);
            service.persist(store)?;
            return Ok(service);
        };

        let keys = keypair_from_private(PrivateKey(stored.private_key));
        if keys.public != stored.public_key || derive_identity_id(&keys.public) != stored.id {
            return Err(IdentityError::Inconsistent(stored.id.to_string()));
        }

        let device = attestation.device_attestation();
        let rebound = device != stored.device_attestation;
        if rebound {
            tracing::warn!(
                identity = %stored.id,
                "device attestation changed since last run, rebinding identity"
            );
            stored.device_attestation = device;
        }

        let service = Self {
            identity: Identity {
                id: stored.id.clone(),
                public_key: stored.public_key,
                created_at: stored.created_at,
                device_attestation: stored.device_attestation.clone(),
                network_attestation: attestation.network_attestation(),
            },
            keys,
            cooldown_ms: params.cooldown_ms(),
            clock,
        };
        if rebound {
            service.persist(store)?;
        }
        tracing::debug!(identity = %service.identity.id, "loaded identity");
        Ok(service)
    }

    pub fn persist(&self, store: &dyn RecordStore) -> Result<(), IdentityError> {
        let record = StoredIdentity {
            id: self.identity.id.clone(),
            public_key: self.identity.public_key,
            private_key: self.keys.private.0,
            created_at: self.identity.created_at,
            device_attestation: self.identity.device_attestation.clone(),
        };
        put_record(store, Collection::Identity, LOCAL_SLOT, &record)?;
        Ok(())
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn id(&self) -> &IdentityId {
        &self.identity.id
    }

    pub fn public_key(&self) -> PublicKey {
        self.identity.public_key
    }

    pub fn device_attestation(&self) -> &str {
        &self.identity.device_attestation
    }

    pub fn network_attestation(&self) -> Option<&str> {
        self.identity.network_attestation.as_deref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        sign_message(message, &self.keys.private)
    }

    /// Never fails: malformed input simply does not verify.
    pub fn verify(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
        verify_signature(message, signature, public_key)
    }

    pub fn sign_claim(&self, content: &str, timestamp: Timestamp, stake: u64) -> Signature {
        self.sign(&claim_signing_payload(content, timestamp, stake))
    }

    pub fn sign_vote(
        &self,
        claim_id: &ClaimId,
        direction: Direction,
        stake: u64,
        timestamp: Timestamp,
    ) -> Signature {
        self.sign(&vote_signing_payload(claim_id, direction, stake, timestamp))
    }

    pub fn account_age_ms(&self) -> u64 {
        self.identity.created_at.elapsed_since(self.clock.now())
    }

    pub fn account_age_days(&self) -> f64 {
        self.account_age_ms() as f64 / MILLIS_PER_DAY as f64
    }

    /// True while the account is younger than the cooldown period.
    pub fn is_new_account(&self) -> bool {
        self.account_age_ms() < self.cooldown_ms
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
