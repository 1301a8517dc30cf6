//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Consistent span names and field sets make it easy to filter and
//! correlate traces across several nodes in one process.

use tracing::{info_span, Span};

/// Span covering a locally posted claim.
pub fn post_claim_span(node: &str, stake: u64) -> Span {
    info_span!("post_claim", node = %node, stake)
}

/// Span covering a locally cast vote.
pub fn cast_vote_span(node: &str, claim: &str, count: u64) -> Span {
    info_span!("cast_vote", node = %node, claim = %claim, count)
}

/// Span covering one seal pass over all open claims.
pub fn seal_pass_span(node: &str) -> Span {
    info_span!("seal_pass", node = %node)
}

/// Span covering the handling of a single transport event.
pub fn replication_span(node: &str) -> Span {
    info_span!("replication", node = %node)
}
