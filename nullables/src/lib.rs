//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the engine (clock, attestation,
//! storage) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests and simulations.

pub mod attestation;
pub mod clock;
pub mod store;

pub use attestation::NullAttestation;
pub use clock::NullClock;
pub use store::NullStore;
