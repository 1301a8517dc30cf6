//! Protocol parameters: economics, sealing, and sybil-defense knobs.
//!
//! Every interval is in milliseconds. The loading mechanism lives in the
//! node crate; this type only carries values and their defaults.

use crate::time::{MILLIS_PER_DAY, MILLIS_PER_HOUR};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("{name} must lie in [0, 1), got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    #[error("supermajority threshold must lie in (0.5, 1], got {0}")]
    SupermajorityOutOfRange(f64),

    #[error("{0} must be non-zero")]
    ZeroValue(&'static str),
}

/// All tunable values of a node's engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RumorParams {
    // ── Reputation ───────────────────────────────────────────────────────
    /// Balance granted to a freshly created account.
    pub initial_reputation: u64,

    /// Minimum stake an author must commit to post a claim.
    pub min_post_stake: u64,

    /// When false, decay never runs.
    pub decay_enabled: bool,

    /// Fraction of the balance removed per decay interval.
    pub decay_rate: f64,

    pub decay_interval_ms: u64,

    /// Balance above which a slash triggers the progressive penalty.
    pub high_rep_threshold: u64,

    /// Fraction of the post-slash balance taken as the progressive penalty.
    pub high_rep_penalty_rate: f64,

    // ── Voting ───────────────────────────────────────────────────────────
    /// Quadratic (`n²`) or linear (`n`) vote pricing.
    pub quadratic_voting: bool,

    /// Existing total stake above which new accounts may not vote.
    pub trending_stake_threshold: u64,

    // ── Sealing ──────────────────────────────────────────────────────────
    /// A claim seals by timeout once this much time has passed since creation.
    pub sealing_window_ms: u64,

    /// Weighted share at which a claim seals early.
    pub supermajority_threshold: f64,

    // ── Sybil defense ────────────────────────────────────────────────────
    pub cooldown_enabled: bool,
    pub cooldown_days: u64,

    /// At most one vote per (claim, device attestation).
    pub device_binding_enabled: bool,

    // ── Claims ───────────────────────────────────────────────────────────
    /// Maximum content length in characters.
    pub max_claim_length: usize,

    /// Duration used when the caller does not pick one.
    pub default_claim_duration_hours: u64,

    /// Replicated claims older than this are refused.
    pub max_claim_age_ms: u64,
}

impl RumorParams {
    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_days.saturating_mul(MILLIS_PER_DAY)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("decay_rate", self.decay_rate),
            ("high_rep_penalty_rate", self.high_rep_penalty_rate),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ParamsError::RateOutOfRange { name, value });
            }
        }
        if !(self.supermajority_threshold > 0.5 && self.supermajority_threshold <= 1.0) {
            return Err(ParamsError::SupermajorityOutOfRange(
                self.supermajority_threshold,
            ));
        }
        for (name, value) in [
            ("decay_interval_ms", self.decay_interval_ms),
            ("sealing_window_ms", self.sealing_window_ms),
            ("max_claim_age_ms", self.max_claim_age_ms),
            ("default_claim_duration_hours", self.default_claim_duration_hours),
        ] {
            if value == 0 {
                return Err(ParamsError::ZeroValue(name));
            }
        }
        if self.max_claim_length == 0 {
            return Err(ParamsError::ZeroValue("max_claim_length"));
        }
        Ok(())
    }
}

impl Default for RumorParams {
    fn default() -> Self {
        Self {
            initial_reputation: 100,
            min_post_stake: 10,
            decay_enabled: true,
            decay_rate: 0.05,
            decay_interval_ms: 7 * MILLIS_PER_DAY,
            high_rep_threshold: 500,
            high_rep_penalty_rate: 0.2,
            quadratic_voting: true,
            trending_stake_threshold: 100,
            sealing_window_ms: 48 * MILLIS_PER_HOUR,
            supermajority_threshold: 0.66,
            cooldown_enabled: true,
            cooldown_days: 7,
            device_binding_enabled: true,
            max_claim_length: 280,
            default_claim_duration_hours: 24,
            max_claim_age_ms: 7 * MILLIS_PER_DAY,
        }
    }
}
