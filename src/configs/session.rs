use serde::{Deserialize, Serialize};

use crate::session::constants::{DEFAULT_HOST_DELAY_MS, MAX_HOST_DELAY_MS, RENDEZVOUS_PREFIX};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Extra delay the host applies to its own scheduled commands so members
    /// that still have to receive them over the network catch up.
    #[serde(default = "default_host_delay_ms")]
    pub host_delay_ms: u64,
    /// Prefix joined with the room code to form the host's transport address.
    #[serde(default = "default_rendezvous_prefix")]
    pub rendezvous_prefix: String,
    #[serde(default)]
    pub drift: DriftConfig,
}

impl SessionConfig {
    /// Host delay clamped to the supported range.
    pub fn host_delay_ms(&self) -> u64 {
        self.host_delay_ms.min(MAX_HOST_DELAY_MS)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host_delay_ms: default_host_delay_ms(),
            rendezvous_prefix: default_rendezvous_prefix(),
            drift: DriftConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriftConfig {
    /// Nudge local playback toward the host's sync pulses.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_drift_threshold_ms")]
    pub threshold_ms: u64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_ms: default_drift_threshold_ms(),
        }
    }
}

fn default_host_delay_ms() -> u64 {
    DEFAULT_HOST_DELAY_MS
}

fn default_rendezvous_prefix() -> String {
    RENDEZVOUS_PREFIX.to_string()
}

fn default_drift_threshold_ms() -> u64 {
    150
}
