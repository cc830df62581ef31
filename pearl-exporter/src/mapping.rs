//! Mapping from a probe result to Prometheus samples.
//!
//! Every family is a gauge. Names are relative; the namespace prefix is
//! applied when the snapshot is encoded.

use pearl_device::AudioChannel;

use crate::probe::ProbeResult;

/// Static description of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDef {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

pub const PROBE_SUCCESS: FamilyDef = FamilyDef {
    name: "probe_success",
    help: "Displays whether or not the probe was a success",
    labels: &[],
};

pub const PROBE_DURATION: FamilyDef = FamilyDef {
    name: "probe_duration_seconds",
    help: "Returns how long the probe took to complete in seconds",
    labels: &[],
};

pub const SYSTEM_INFO: FamilyDef = FamilyDef {
    name: "system_info",
    help: "Returns system info for the probed device",
    labels: &["firmware_version", "firmware_update_availability", "uptime"],
};

pub const CPU_INFO: FamilyDef = FamilyDef {
    name: "cpu_info",
    help: "Returns information regarding the systems cpu load",
    labels: &["type"],
};

pub const CPU_TEMP: FamilyDef = FamilyDef {
    name: "cpu_temp",
    help: "Current temperature for the CPU",
    labels: &[],
};

pub const STORAGE: FamilyDef = FamilyDef {
    name: "storage",
    help: "Returns the current status for the storage devices attached",
    labels: &["type"],
};

pub const RECORDER_INFO: FamilyDef = FamilyDef {
    name: "recorder_info",
    help: "Returns whether each configured recorder is active",
    labels: &["id"],
};

pub const CHANNELS_INFO: FamilyDef = FamilyDef {
    name: "channels_info",
    help: "Returns information regarding the configured channels",
    labels: &["id", "status", "type"],
};

pub const PUBLISHER_INFO: FamilyDef = FamilyDef {
    name: "publisher_info",
    help: "Returns whether each channel publisher is started",
    labels: &["channel", "id", "state"],
};

pub const SDI_STATUS: FamilyDef = FamilyDef {
    name: "sdi_status",
    help: "Returns information regarding the SDI input, sets the value to the current fps",
    labels: &["resolution"],
};

pub const HDMI_STATUS: FamilyDef = FamilyDef {
    name: "hdmi_status",
    help: "Returns information regarding the HDMI input, sets the value to the current fps",
    labels: &["resolution"],
};

pub const RCA_AUDIO_STATUS: FamilyDef = FamilyDef {
    name: "rca_audio_status",
    help: "Returns the current audio levels for the RCA/line in audio input",
    labels: &["channel", "type"],
};

pub const BUILD_INFO: FamilyDef = FamilyDef {
    name: "exporter_build_info",
    help: "Build information of the running exporter",
    labels: &["version"],
};

/// One labeled value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label pairs in the family's label order.
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// A family together with its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub def: FamilyDef,
    pub samples: Vec<Sample>,
}

/// Immutable set of families produced for one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot {
    families: Vec<MetricFamily>,
}

impl MetricSnapshot {
    /// Families in the order they were first populated.
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.def.name == name)
    }

    /// Value of the sample whose labels are exactly `labels`.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.family(name)?
            .samples
            .iter()
            .find(|s| {
                s.labels.len() == labels.len()
                    && s.labels
                        .iter()
                        .zip(labels)
                        .all(|((k, v), (ek, ev))| k == ek && v == ev)
            })
            .map(|s| s.value)
    }

    /// Total number of samples across all families.
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }
}

/// Accumulates samples for a single response.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    families: Vec<MetricFamily>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of one sample. A later call with the same label values
    /// replaces the earlier one.
    pub fn set(&mut self, def: &FamilyDef, label_values: &[&str], value: f64) {
        debug_assert_eq!(
            def.labels.len(),
            label_values.len(),
            "label count mismatch for {}",
            def.name
        );

        let labels: Vec<(String, String)> = def
            .labels
            .iter()
            .zip(label_values)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let family = match self.families.iter().position(|f| f.def.name == def.name) {
            Some(index) => &mut self.families[index],
            None => {
                self.families.push(MetricFamily {
                    def: *def,
                    samples: Vec::new(),
                });
                let last = self.families.len() - 1;
                &mut self.families[last]
            }
        };

        match family.samples.iter_mut().find(|s| s.labels == labels) {
            Some(sample) => sample.value = value,
            None => family.samples.push(Sample { labels, value }),
        }
    }

    pub fn build(self) -> MetricSnapshot {
        MetricSnapshot {
            families: self.families,
        }
    }
}

/// Translate a probe result into samples.
///
/// The probe metrics are always present. Device metrics are present only if
/// the probe succeeded and the endpoint behind them answered.
pub fn map_probe(result: &ProbeResult) -> MetricSnapshot {
    let mut builder = SnapshotBuilder::new();

    builder.set(&PROBE_SUCCESS, &[], bool_value(result.is_success()));
    builder.set(&PROBE_DURATION, &[], result.duration_seconds());

    let Ok(firmware) = &result.firmware_version else {
        return builder.build();
    };

    if let Ok(update) = &result.firmware_update {
        let uptime = result
            .system
            .as_ref()
            .map(|s| format_uptime(s.uptime))
            .unwrap_or_default();
        builder.set(
            &SYSTEM_INFO,
            &[
                firmware.version.as_str(),
                update.status.as_str(),
                uptime.as_str(),
            ],
            1.0,
        );
    }

    if let Ok(system) = &result.system {
        builder.set(&CPU_INFO, &["load"], system.cpu_load);
        builder.set(&CPU_INFO, &["load_high"], bool_value(system.cpu_load_high));
        builder.set(&CPU_TEMP, &[], system.cpu_temp);
    }

    if let Ok(storage) = &result.storage {
        builder.set(&STORAGE, &["total"], storage.total);
        builder.set(&STORAGE, &["free"], storage.free);
    }

    if let Ok(recorders) = &result.recorders {
        for recorder in recorders {
            builder.set(&RECORDER_INFO, &[recorder.id.as_str()], bool_value(recorder.is_active()));
        }
    }

    if let Ok(channels) = &result.channels {
        for channel in channels {
            let status = &channel.status;
            let id = channel.id.as_str();
            let state = status.state.as_str();
            builder.set(&CHANNELS_INFO, &[id, state, "nosignal"], status.nosignal);
            builder.set(&CHANNELS_INFO, &[id, state, "bitrate"], status.bitrate);
            builder.set(&CHANNELS_INFO, &[id, state, "duration"], status.duration);

            for publisher in &channel.publishers {
                builder.set(
                    &PUBLISHER_INFO,
                    &[id, publisher.id.as_str(), publisher.status.state.as_str()],
                    bool_value(publisher.status.started),
                );
            }
        }
    }

    if let Some(hardware) = &result.hardware {
        for (def, inputs) in [(&SDI_STATUS, &hardware.sdi), (&HDMI_STATUS, &hardware.hdmi)] {
            if let Ok(inputs) = inputs {
                for input in inputs {
                    let video = &input.status.video;
                    builder.set(def, &[video.resolution.as_str()], video.actual_fps);
                }
            }
        }

        if let Ok(levels) = &hardware.audio {
            for channel in AudioChannel::ALL {
                builder.set(&RCA_AUDIO_STATUS, &[channel.as_str(), "peak"], levels.peak(channel));
                builder.set(&RCA_AUDIO_STATUS, &[channel.as_str(), "rms"], levels.rms(channel));
            }
        }
    }

    builder.build()
}

/// Samples describing the exporter itself.
pub fn build_info() -> MetricSnapshot {
    let mut builder = SnapshotBuilder::new();
    builder.set(&BUILD_INFO, &[env!("CARGO_PKG_VERSION")], 1.0);
    builder.build()
}

fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Uptime label in whole seconds.
fn format_uptime(uptime: f64) -> String {
    if uptime.is_finite() {
        format!("{}", uptime.trunc() as i64)
    } else {
        String::new()
    }
}
