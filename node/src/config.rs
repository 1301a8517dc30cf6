//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use rumorality_types::RumorParams;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a Rumorality node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Engine parameters live under
/// the `[params]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// How often open claims are checked for sealing (and decay is
    /// applied). Zero disables the background task; the node's
    /// `seal_pass`/`decay_tick` can still be called directly.
    #[serde(default = "default_seal_scan_interval_ms")]
    pub seal_scan_interval_ms: u64,

    /// How often candidate peers are dialed. Zero disables the task.
    #[serde(default = "default_peer_probe_interval_ms")]
    pub peer_probe_interval_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub params: RumorParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_seal_scan_interval_ms() -> u64 {
    10_000
}

fn default_peer_probe_interval_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate its parameters.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.params.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Background tasks off; every periodic step is driven by hand.
    pub fn manual() -> Self {
        Self {
            seal_scan_interval_ms: 0,
            peer_probe_interval_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            seal_scan_interval_ms: default_seal_scan_interval_ms(),
            peer_probe_interval_ms: default_peer_probe_interval_ms(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
            params: RumorParams::default(),
        }
    }
}
