//! Prometheus metrics for the Rumorality node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub claims_posted: IntCounter,
    /// Votes cast by the local participant.
    pub votes_cast: IntCounter,
    /// Claims received from peers and merged.
    pub claims_merged: IntCounter,
    /// Votes received from peers and merged.
    pub votes_merged: IntCounter,
    pub claims_sealed: IntCounter,
    /// Inbound records refused by validation or merge (duplicates excluded).
    pub inbound_rejected: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub open_sessions: IntGauge,
    /// The local participant's reputation balance.
    pub reputation_balance: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let claims_posted = register_int_counter_with_registry!(
            Opts::new("rumorality_claims_posted_total", "Claims posted locally"),
            registry
        )?;
        let votes_cast = register_int_counter_with_registry!(
            Opts::new("rumorality_votes_cast_total", "Votes cast locally"),
            registry
        )?;
        let claims_merged = register_int_counter_with_registry!(
            Opts::new("rumorality_claims_merged_total", "Claims merged from peers"),
            registry
        )?;
        let votes_merged = register_int_counter_with_registry!(
            Opts::new("rumorality_votes_merged_total", "Votes merged from peers"),
            registry
        )?;
        let claims_sealed = register_int_counter_with_registry!(
            Opts::new("rumorality_claims_sealed_total", "Claims sealed by this node"),
            registry
        )?;
        let inbound_rejected = register_int_counter_with_registry!(
            Opts::new(
                "rumorality_inbound_rejected_total",
                "Inbound records refused during replication"
            ),
            registry
        )?;

        let open_sessions = register_int_gauge_with_registry!(
            Opts::new("rumorality_open_sessions", "Peer sessions currently open"),
            registry
        )?;
        let reputation_balance = register_int_gauge_with_registry!(
            Opts::new("rumorality_reputation_balance", "Local reputation balance"),
            registry
        )?;

        Ok(Self {
            registry,
            claims_posted,
            votes_cast,
            claims_merged,
            votes_merged,
            claims_sealed,
            inbound_rejected,
            open_sessions,
            reputation_balance,
        })
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| NodeError::Config(e.to_string()))
    }
}
