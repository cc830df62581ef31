//! Probe orchestration: query every endpoint of one device and collect the results.

use std::time::Duration;

use pearl_device::{
    AudioLevels, Channel, ClientError, DeviceClient, DeviceConfig, Endpoint, EndpointError,
    EndpointResult, FirmwareUpdate, FirmwareVersion, Record, Recorder, StorageStatus,
    SystemStatus, Target, VideoInput,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Deadline used when the requested timeout cannot be represented.
const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Per-request probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Budget for the whole probe; outstanding calls are abandoned when it runs out.
    pub timeout: Duration,
    /// Channel ids to keep in the channel status (empty = all).
    pub channels: Vec<String>,
}

/// Results of the optional hardware input endpoints.
#[derive(Debug)]
pub struct HardwareInputs {
    pub sdi: EndpointResult<Vec<VideoInput>>,
    pub hdmi: EndpointResult<Vec<VideoInput>>,
    pub audio: EndpointResult<AudioLevels>,
}

/// Everything learned about a device during one probe.
#[derive(Debug)]
pub struct ProbeResult {
    pub firmware_version: EndpointResult<FirmwareVersion>,
    pub firmware_update: EndpointResult<FirmwareUpdate>,
    pub system: EndpointResult<SystemStatus>,
    pub storage: EndpointResult<StorageStatus>,
    pub channels: EndpointResult<Vec<Channel>>,
    pub recorders: EndpointResult<Vec<Recorder>>,
    /// `None` when hardware inputs are not probed.
    pub hardware: Option<HardwareInputs>,
    pub duration: Duration,
}

impl ProbeResult {
    /// A probe succeeds iff the firmware version could be read.
    pub fn is_success(&self) -> bool {
        self.firmware_version.is_ok()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Failed endpoints, in probe order.
    pub fn failures(&self) -> Vec<(Endpoint, &EndpointError)> {
        let mut failures = vec![
            (Endpoint::FirmwareVersion, self.firmware_version.as_ref().err()),
            (Endpoint::FirmwareUpdate, self.firmware_update.as_ref().err()),
            (Endpoint::SystemStatus, self.system.as_ref().err()),
            (Endpoint::StorageStatus, self.storage.as_ref().err()),
            (Endpoint::ChannelStatus, self.channels.as_ref().err()),
            (Endpoint::RecorderStatus, self.recorders.as_ref().err()),
        ];
        if let Some(hw) = &self.hardware {
            failures.push((Endpoint::SdiStatus, hw.sdi.as_ref().err()));
            failures.push((Endpoint::HdmiStatus, hw.hdmi.as_ref().err()));
            failures.push((Endpoint::AudioStatus, hw.audio.as_ref().err()));
        }

        failures
            .into_iter()
            .filter_map(|(endpoint, err)| err.map(|e| (endpoint, e)))
            .collect()
    }
}

/// Runs probes against devices.
///
/// Holds no per-device state, so one instance serves all requests.
#[derive(Debug, Clone)]
pub struct Prober {
    client: DeviceClient,
    hardware_inputs: bool,
}

impl Prober {
    pub fn new(client: DeviceClient, config: &DeviceConfig) -> Self {
        Self {
            client,
            hardware_inputs: config.hardware_inputs,
        }
    }

    /// Probe a device. Never fails; endpoint failures are recorded in the result.
    pub async fn probe(&self, target: &Target, options: &ProbeOptions) -> ProbeResult {
        let start = Instant::now();
        let deadline = start
            .checked_add(options.timeout)
            .unwrap_or_else(|| start + MAX_PROBE_TIMEOUT);

        info!(device = %target, "Beginning probe");

        let (firmware_version, firmware_update, system, storage, channels, recorders, hardware) = tokio::join!(
            self.call::<FirmwareVersion>(target, Endpoint::FirmwareVersion, deadline),
            self.call::<FirmwareUpdate>(target, Endpoint::FirmwareUpdate, deadline),
            self.call::<SystemStatus>(target, Endpoint::SystemStatus, deadline),
            self.call::<StorageStatus>(target, Endpoint::StorageStatus, deadline),
            self.call::<Vec<Channel>>(target, Endpoint::ChannelStatus, deadline),
            self.call::<Vec<Recorder>>(target, Endpoint::RecorderStatus, deadline),
            self.probe_hardware(target, deadline),
        );

        let result = ProbeResult {
            firmware_version,
            firmware_update,
            system,
            storage,
            channels: channels.map(|list| select_channels(list, &options.channels)),
            recorders,
            hardware,
            duration: start.elapsed(),
        };

        if result.is_success() {
            info!(
                device = %target,
                duration_seconds = result.duration_seconds(),
                failed_endpoints = result.failures().len(),
                "Probe succeeded"
            );
        } else {
            info!(
                device = %target,
                duration_seconds = result.duration_seconds(),
                "Probe failed"
            );
        }

        result
    }

    async fn probe_hardware(&self, target: &Target, deadline: Instant) -> Option<HardwareInputs> {
        if !self.hardware_inputs {
            return None;
        }

        let (sdi, hdmi, audio) = tokio::join!(
            self.call::<Vec<VideoInput>>(target, Endpoint::SdiStatus, deadline),
            self.call::<Vec<VideoInput>>(target, Endpoint::HdmiStatus, deadline),
            self.call::<AudioLevels>(target, Endpoint::AudioStatus, deadline),
        );

        Some(HardwareInputs { sdi, hdmi, audio })
    }

    /// Query and decode one endpoint, bounded by the probe deadline.
    async fn call<T: Record>(
        &self,
        target: &Target,
        endpoint: Endpoint,
        deadline: Instant,
    ) -> EndpointResult<T> {
        let result = match tokio::time::timeout_at(deadline, self.client.query::<T>(target, endpoint))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout {
                url: target.url(self.client.endpoints().path(endpoint)),
            }
            .into()),
        };

        if let Err(e) = &result {
            if endpoint.is_mandatory() {
                warn!(device = %target, endpoint = %endpoint, error = %e, "Mandatory endpoint failed");
            } else {
                debug!(device = %target, endpoint = %endpoint, error = %e, "Endpoint failed");
            }
        }

        result
    }
}

/// Keep only the selected channels; an empty selection keeps all.
fn select_channels(mut channels: Vec<Channel>, selection: &[String]) -> Vec<Channel> {
    if !selection.is_empty() {
        channels.retain(|c| selection.iter().any(|id| id == &c.id));
    }
    channels
}
