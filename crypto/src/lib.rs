//! Cryptographic primitives for Rumorality.
//!
//! - **Ed25519** for claim and vote signatures
//! - **Blake2b-256** for content-derived claim/vote ids, identity ids,
//!   and tombstone digests
//! - Canonical byte payloads that signers and verifiers agree on

pub mod error;
pub mod hash;
pub mod keys;
pub mod payload;
pub mod sign;

pub use error::CryptoError;
pub use hash::{
    blake2b_256, blake2b_256_multi, claim_id, derive_identity_id, tombstone_digest, vote_id,
    TOMBSTONE_PREFIX,
};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use payload::{claim_signing_payload, vote_signing_payload};
pub use sign::{decode_public_key, decode_signature, sign_message, verify_hex, verify_signature};
