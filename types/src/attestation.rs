//! Device and network attestation collaborators.
//!
//! The fingerprinting algorithm itself lives outside the core. The core
//! only needs a stable opaque string per device and an optional one per
//! network origin.

/// Sentinel reported when a device cannot be fingerprinted reliably.
///
/// Every such device shares this value, so device binding admits a
/// single vote per claim across all of them.
pub const ANONYMOUS_DEVICE: &str = "anonymous_device_blocked";

pub trait AttestationProvider: Send + Sync {
    /// Stable per device, or [`ANONYMOUS_DEVICE`] under ambiguous conditions.
    fn device_attestation(&self) -> String;

    /// Opaque network-origin digest, when available.
    fn network_attestation(&self) -> Option<String>;
}

/// Fixed attestation values, for embedding hosts that compute them up front.
#[derive(Clone, Debug)]
pub struct StaticAttestation {
    pub device: String,
    pub network: Option<String>,
}

impl StaticAttestation {
    pub fn new(device: impl Into<String>, network: Option<String>) -> Self {
        Self {
            device: device.into(),
            network,
        }
    }

    /// An attestation for a device that could not be fingerprinted.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_DEVICE, None)
    }
}

impl AttestationProvider for StaticAttestation {
    fn device_attestation(&self) -> String {
        if self.device.is_empty() {
            ANONYMOUS_DEVICE.to_string()
        } else {
            self.device.clone()
        }
    }

    fn network_attestation(&self) -> Option<String> {
        self.network.clone()
    }
}
