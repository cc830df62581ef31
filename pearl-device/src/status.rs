//! Status records returned by the device and their decoders.
//!
//! Every answer is wrapped in an envelope `{"status": "ok", "result": ...}`.
//! Field names are accepted both in the device's native lower case and in
//! PascalCase. Unknown fields are ignored.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::DecodeError;

/// A record that can be decoded from an endpoint's `result` payload.
pub trait Record: DeserializeOwned {
    /// Checks that serde cannot express.
    fn validate(&self) -> Result<(), DecodeError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, alias = "Status")]
    status: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
    #[serde(default, alias = "Result")]
    result: Option<serde_json::Value>,
}

/// Decode a raw endpoint answer into its record.
pub fn decode<T: Record>(bytes: &[u8]) -> Result<T, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;

    if let Some(status) = &envelope.status
        && !status.eq_ignore_ascii_case("ok")
    {
        return Err(DecodeError::Device {
            status: status.clone(),
            message: envelope.message.unwrap_or_default(),
        });
    }

    let result = envelope.result.ok_or(DecodeError::Field {
        field: "result",
        reason: "missing".to_string(),
    })?;

    let record: T = serde_json::from_value(result)?;
    record.validate()?;
    Ok(record)
}

/// Installed firmware version string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FirmwareVersion {
    pub version: String,
}

impl Record for FirmwareVersion {}

/// Result of the firmware update check.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FirmwareUpdate {
    /// Availability as reported by the device, e.g. "no_updates".
    #[serde(alias = "Status")]
    pub status: String,
    #[serde(default, alias = "Allowed")]
    pub allowed: Option<String>,
    #[serde(default, alias = "Version")]
    pub version: Option<String>,
    #[serde(default, alias = "Changed")]
    pub changed: bool,
}

impl Record for FirmwareUpdate {}

/// System health.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemStatus {
    #[serde(default, alias = "Date")]
    pub date: Option<String>,
    /// Seconds since boot.
    #[serde(alias = "Uptime")]
    pub uptime: f64,
    /// CPU load in percent.
    #[serde(rename = "cpuload", alias = "CpuLoad")]
    pub cpu_load: f64,
    #[serde(default, rename = "cpuload_high", alias = "CpuLoadHigh", alias = "cpuloadhigh")]
    pub cpu_load_high: bool,
    /// CPU temperature in degrees Celsius.
    #[serde(rename = "cputemp", alias = "Cputemp", alias = "CpuTemp")]
    pub cpu_temp: f64,
    #[serde(default, rename = "cputemp_threshold", alias = "CputempThreshold")]
    pub cpu_temp_threshold: Option<f64>,
}

impl Record for SystemStatus {}

/// Main storage capacity in bytes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageStatus {
    #[serde(default, alias = "State")]
    pub state: Option<String>,
    #[serde(alias = "Total")]
    pub total: f64,
    #[serde(alias = "Free")]
    pub free: f64,
}

impl Record for StorageStatus {}

/// One recorder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recorder {
    #[serde(alias = "Id", alias = "ID")]
    pub id: String,
    #[serde(alias = "Status")]
    pub status: RecorderState,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecorderState {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(default, alias = "Duration")]
    pub duration: Option<f64>,
}

impl Recorder {
    /// A recorder counts as active unless its state is exactly "stopped".
    pub fn is_active(&self) -> bool {
        self.status.state != "stopped"
    }
}

impl Record for Vec<Recorder> {}

/// One channel and its publishers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Channel {
    #[serde(alias = "Id", alias = "ID")]
    pub id: String,
    #[serde(alias = "Status")]
    pub status: ChannelState,
    #[serde(default, alias = "Publishers")]
    pub publishers: Vec<Publisher>,
}

/// Signal and encoder state of a channel.
///
/// The numbers are floats because firmware revisions disagree on whether
/// they are integers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelState {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(alias = "Nosignal", alias = "NoSignal")]
    pub nosignal: f64,
    #[serde(alias = "Bitrate")]
    pub bitrate: f64,
    #[serde(alias = "Duration")]
    pub duration: f64,
}

impl Record for Vec<Channel> {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Publisher {
    #[serde(alias = "Id", alias = "ID")]
    pub id: String,
    #[serde(alias = "Status")]
    pub status: PublisherState,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PublisherState {
    #[serde(default, alias = "IsConfigured", alias = "isconfigured")]
    pub is_configured: bool,
    #[serde(default, alias = "Started")]
    pub started: bool,
    #[serde(default, alias = "State")]
    pub state: String,
    #[serde(default, alias = "Duration")]
    pub duration: Option<f64>,
}

/// A digital video input (SDI or HDMI).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoInput {
    #[serde(alias = "Id", alias = "ID")]
    pub id: String,
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    #[serde(alias = "Status")]
    pub status: VideoInputStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoInputStatus {
    #[serde(alias = "Video")]
    pub video: VideoSignal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSignal {
    #[serde(alias = "Resolution")]
    pub resolution: String,
    #[serde(alias = "Actual_fps", alias = "ActualFps")]
    pub actual_fps: f64,
    #[serde(default, alias = "Interlaced")]
    pub interlaced: bool,
    #[serde(default, alias = "State")]
    pub state: Option<String>,
    #[serde(default, alias = "Vrr")]
    pub vrr: Option<f64>,
}

impl Record for Vec<VideoInput> {}

/// Side of a stereo analog audio input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioChannel {
    Left,
    Right,
}

impl AudioChannel {
    pub const ALL: [AudioChannel; 2] = [AudioChannel::Left, AudioChannel::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioChannel::Left => "left",
            AudioChannel::Right => "right",
        }
    }

    fn index(&self) -> usize {
        match self {
            AudioChannel::Left => 0,
            AudioChannel::Right => 1,
        }
    }
}

/// Analog audio levels, one value per channel (left, right).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioLevels {
    #[serde(alias = "Peak")]
    peak: Vec<f64>,
    #[serde(alias = "Rms", alias = "RMS")]
    rms: Vec<f64>,
}

impl AudioLevels {
    pub fn new(peak: [f64; 2], rms: [f64; 2]) -> Self {
        Self {
            peak: peak.to_vec(),
            rms: rms.to_vec(),
        }
    }

    pub fn peak(&self, channel: AudioChannel) -> f64 {
        self.peak[channel.index()]
    }

    pub fn rms(&self, channel: AudioChannel) -> f64 {
        self.rms[channel.index()]
    }
}

impl Record for AudioLevels {
    fn validate(&self) -> Result<(), DecodeError> {
        for (field, values) in [("peak", &self.peak), ("rms", &self.rms)] {
            if values.len() < AudioChannel::ALL.len() {
                return Err(DecodeError::Field {
                    field,
                    reason: format!("expected 2 values, got {}", values.len()),
                });
            }
        }
        Ok(())
    }
}
