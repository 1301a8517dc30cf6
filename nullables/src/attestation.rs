//! Nullable attestation: fixed, swappable device and network fingerprints.

use rumorality_types::{AttestationProvider, ANONYMOUS_DEVICE};
use std::sync::Mutex;

pub struct NullAttestation {
    device: Mutex<String>,
    network: Mutex<Option<String>>,
}

impl NullAttestation {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: Mutex::new(device.into()),
            network: Mutex::new(None),
        }
    }

    /// A device that cannot be fingerprinted.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_DEVICE)
    }

    pub fn with_network(self, network: impl Into<String>) -> Self {
        self.set_network(Some(network.into()));
        self
    }

    /// Simulate the device fingerprint changing between runs.
    pub fn set_device(&self, device: impl Into<String>) {
        if let Ok(mut d) = self.device.lock() {
            *d = device.into();
        }
    }

    pub fn set_network(&self, network: Option<String>) {
        if let Ok(mut n) = self.network.lock() {
            *n = network;
        }
    }
}

impl AttestationProvider for NullAttestation {
    fn device_attestation(&self) -> String {
        self.device
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|_| ANONYMOUS_DEVICE.to_string())
    }

    fn network_attestation(&self) -> Option<String> {
        self.network.lock().ok().and_then(|n| n.clone())
    }
}
