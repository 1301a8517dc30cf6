//! Shared types for Rumorality.
//!
//! This crate defines the data model every other crate in the workspace
//! speaks: identity ids and key material, claim/vote ids, timestamps,
//! the claim and vote records with their tallies, protocol parameters,
//! the error taxonomy, and the small collaborator traits (clock,
//! attestation) that services receive by injection.

pub mod attestation;
pub mod claim;
pub mod error;
pub mod hash;
mod hex_serde;
pub mod identity;
pub mod keys;
pub mod params;
pub mod time;
pub mod vote;

pub use attestation::{AttestationProvider, StaticAttestation, ANONYMOUS_DEVICE};
pub use claim::{Claim, ClaimState, Direction, Outcome, ParseDirectionError, Tally, TallySide, VoterEntry};
pub use error::ErrorKind;
pub use hash::{ClaimId, ParseIdError, VoteId};
pub use identity::IdentityId;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::{ParamsError, RumorParams};
pub use time::{Clock, SystemClock, Timestamp, MILLIS_PER_DAY, MILLIS_PER_HOUR};
pub use vote::Vote;
