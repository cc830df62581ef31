//! Device REST endpoints and the order they are probed in.

use reqwest::Method;
use serde::{Deserialize, Serialize};

/// One status endpoint of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FirmwareVersion,
    FirmwareUpdate,
    SystemStatus,
    StorageStatus,
    ChannelStatus,
    RecorderStatus,
    SdiStatus,
    HdmiStatus,
    AudioStatus,
}

impl Endpoint {
    /// Endpoints queried on every probe, mandatory one first.
    pub const CORE: [Endpoint; 6] = [
        Endpoint::FirmwareVersion,
        Endpoint::FirmwareUpdate,
        Endpoint::SystemStatus,
        Endpoint::StorageStatus,
        Endpoint::ChannelStatus,
        Endpoint::RecorderStatus,
    ];

    /// Endpoints queried only when hardware inputs are enabled.
    pub const HARDWARE_INPUTS: [Endpoint; 3] = [
        Endpoint::SdiStatus,
        Endpoint::HdmiStatus,
        Endpoint::AudioStatus,
    ];

    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::FirmwareVersion => "firmware_version",
            Endpoint::FirmwareUpdate => "firmware_update",
            Endpoint::SystemStatus => "system_status",
            Endpoint::StorageStatus => "storage_status",
            Endpoint::ChannelStatus => "channel_status",
            Endpoint::RecorderStatus => "recorder_status",
            Endpoint::SdiStatus => "sdi_status",
            Endpoint::HdmiStatus => "hdmi_status",
            Endpoint::AudioStatus => "audio_status",
        }
    }

    /// HTTP method for the call. The update check is a trigger, hence POST.
    pub fn method(&self) -> Method {
        match self {
            Endpoint::FirmwareUpdate => Method::POST,
            _ => Method::GET,
        }
    }

    /// Whether this endpoint decides overall probe success.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Endpoint::FirmwareVersion)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative paths of each endpoint, overridable per firmware revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub firmware_version: String,
    pub firmware_update: String,
    pub system_status: String,
    pub storage_status: String,
    pub channel_status: String,
    pub recorder_status: String,
    pub sdi_status: String,
    pub hdmi_status: String,
    pub audio_status: String,
}

impl EndpointPaths {
    /// Path (with query string) for an endpoint.
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::FirmwareVersion => &self.firmware_version,
            Endpoint::FirmwareUpdate => &self.firmware_update,
            Endpoint::SystemStatus => &self.system_status,
            Endpoint::StorageStatus => &self.storage_status,
            Endpoint::ChannelStatus => &self.channel_status,
            Endpoint::RecorderStatus => &self.recorder_status,
            Endpoint::SdiStatus => &self.sdi_status,
            Endpoint::HdmiStatus => &self.hdmi_status,
            Endpoint::AudioStatus => &self.audio_status,
        }
    }

    /// Iterate over every configured path.
    pub fn iter(&self) -> impl Iterator<Item = (Endpoint, &str)> {
        Endpoint::CORE
            .into_iter()
            .chain(Endpoint::HARDWARE_INPUTS)
            .map(|e| (e, self.path(e)))
    }
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            firmware_version: "/api/system/firmware/version".to_string(),
            firmware_update: "/api/system/firmware/update/control/check".to_string(),
            system_status: "/api/system/status".to_string(),
            storage_status: "/api/system/storages/main/status".to_string(),
            channel_status: "/api/channels/status?publishers=true".to_string(),
            recorder_status: "/api/recorders/status".to_string(),
            sdi_status: "/api/inputs/sdi-a/status".to_string(),
            hdmi_status: "/api/inputs/hdmi-a/status".to_string(),
            audio_status: "/api/inputs/rca-a/status".to_string(),
        }
    }
}
