//! Local identity lifecycle.
//!
//! An identity is a random Ed25519 keypair whose id is derived from the
//! public key, so every signature it produces proves ownership of the id.
//! The record is persisted in the identity collection and reloaded on
//! restart; the private key never leaves the node.

pub mod error;
pub mod service;

pub use error::IdentityError;
pub use service::{Identity, IdentityService};
