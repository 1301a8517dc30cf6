//! Vote casting and the vote index.
//!
//! A vote is accepted at most once per (claim, voter) and, with device
//! binding on, at most once per (claim, device attestation). Weight comes
//! from the quadratic (or linear) cost and the voter's balance; the cost
//! is debited from the voter's ledger and the vote is appended to the
//! claim's tally.

pub mod engine;
pub mod error;

pub use engine::VotingEngine;
pub use error::VotingError;
