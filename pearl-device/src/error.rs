use thiserror::Error;

/// Failure to reach the device or get a 2xx answer from it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Invalid device URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Device returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },
}

impl ClientError {
    /// HTTP status code of the failed call, if the device answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A device answer that could not be turned into a status record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device reported status '{status}': {message}")]
    Device { status: String, message: String },

    #[error("Invalid field '{field}': {reason}")]
    Field { field: &'static str, reason: String },
}

/// Why one endpoint produced no record.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Transport(#[from] ClientError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Outcome of a single endpoint call: the decoded record or the reason it is missing.
pub type EndpointResult<T> = std::result::Result<T, EndpointError>;
