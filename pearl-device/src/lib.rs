//! Pearl device library
//!
//! Client and status model for the REST API of Epiphan Pearl streaming and
//! recording appliances:
//!
//! - [`client`] - Authenticated HTTP client (`DeviceClient`, `Target`)
//! - [`endpoint`] - Status endpoints, their paths and probe order
//! - [`status`] - Status records and the JSON envelope decoder
//! - [`config`] - Device connection settings
//! - [`error`] - Transport and decode errors

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod status;

// Re-export commonly used types at the crate root
pub use client::{Credentials, DeviceClient, Target};
pub use config::DeviceConfig;
pub use endpoint::{Endpoint, EndpointPaths};
pub use error::{ClientError, DecodeError, EndpointError, EndpointResult};
pub use status::{
    AudioChannel, AudioLevels, Channel, FirmwareUpdate, FirmwareVersion, Recorder, Record,
    StorageStatus, SystemStatus, VideoInput, decode,
};
