//! Claim lifecycle.
//!
//! Claims are created with an author stake and an automatic TRUE vote,
//! accumulate weighted tallies while open, and seal exactly once.
//! Deletion replaces the content with a tombstone digest and touches
//! nothing else.

pub mod error;
pub mod feed;
pub mod store;

pub use error::ClaimError;
pub use feed::{FeedFilter, ParseFeedFilterError};
pub use store::{ClaimStore, NEUTRAL_TRUST, TRUST_MIN_VOTERS};
