//! Consensus: sealing open claims and settling their stakes.
//!
//! Claims move one way, **Open → Sealed(true | false | tie)**. Two
//! triggers seal a claim:
//! - **Timeout**: the sealing window has passed since creation; the
//!   heavier side wins, equal weight is a tie.
//! - **Supermajority**: one side holds at least the threshold share of
//!   the total weight; seals immediately.
//!
//! Sealing runs settlement for the same claim, applied only to the local
//! participant's ledger. Peers settle independently and may transiently
//! disagree.
//!
//! ## Module overview
//!
//! - [`sealer`]: the trigger evaluation and the seal pass.
//! - [`settlement`]: pure payout computation and its local application.
//! - [`error`]: consensus error types.

pub mod error;
pub mod sealer;
pub mod settlement;

pub use error::ConsensusError;
pub use sealer::{evaluate, resolve_by_weight, ConsensusSealer, SealReport, SealTrigger};
pub use settlement::{compute_settlement, Payout, PayoutKind, Settlement, SettlementEngine};
