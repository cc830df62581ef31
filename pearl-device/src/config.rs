use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointPaths;

/// How to talk to devices. Shared read-only by every probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Username used when the scrape request carries none.
    #[serde(default)]
    pub username: Option<String>,

    /// Password used when the scrape request carries none.
    #[serde(default)]
    pub password: Option<String>,

    /// Accept any TLS certificate presented by the device.
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Upper bound for a single device call and for a whole probe (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Also query the SDI, HDMI and analog audio inputs.
    #[serde(default)]
    pub hardware_inputs: bool,

    /// Channel ids to report (empty = all).
    #[serde(default)]
    pub channels: Vec<String>,

    /// Endpoint paths.
    #[serde(default)]
    pub endpoints: EndpointPaths,
}

fn default_timeout() -> u64 {
    10
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            insecure_skip_verify: false,
            timeout_secs: default_timeout(),
            hardware_inputs: false,
            channels: Vec::new(),
            endpoints: EndpointPaths::default(),
        }
    }
}
