//! Reputation ledger.
//!
//! One account per identity. Reputation is the scarce token that backs
//! claims and votes: staking debits it, settlement credits it back (with
//! a share of the losers' pool), slashing and periodic decay remove it.
//! Every balance change is appended to the account history.

pub mod account;
pub mod error;
pub mod ledger;
pub mod participant;
pub mod pricing;

pub use account::{EntryKind, HistoryEntry, Reason, ReputationAccount};
pub use error::LedgerError;
pub use ledger::ReputationLedger;
pub use participant::Participant;
pub use pricing::{vote_cost, vote_weight, votes_for_cost};
