//! HTTP client for the device REST API.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, Url};
use tracing::{debug, trace};

use crate::config::DeviceConfig;
use crate::endpoint::{Endpoint, EndpointPaths};
use crate::error::{ClientError, EndpointResult};
use crate::status::{Record, decode};

/// Basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A device to probe: its base address plus the credentials to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    address: String,
    credentials: Option<Credentials>,
}

impl Target {
    /// Parse a base address such as `https://pearl.local` or `10.0.0.5:8443`.
    ///
    /// A missing scheme defaults to `http`; trailing slashes are dropped so
    /// endpoint paths can be appended as-is.
    pub fn parse(address: &str) -> Result<Self, ClientError> {
        let trimmed = address.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let invalid = |reason: String| ClientError::InvalidUrl {
            url: address.to_string(),
            reason,
        };

        let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self {
            address: with_scheme.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Attach credentials to this target.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Normalized base address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Full URL of an endpoint path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.address, path)
        } else {
            format!("{}/{}", self.address, path)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Client for the device REST API.
///
/// Cheap to clone; all clones share one connection pool and the TLS policy
/// chosen at construction.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: Client,
    endpoints: EndpointPaths,
}

impl DeviceClient {
    /// Build a client from the device configuration.
    pub fn new(config: &DeviceConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .user_agent(concat!("pearl-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
        })
    }

    /// Configured endpoint paths.
    pub fn endpoints(&self) -> &EndpointPaths {
        &self.endpoints
    }

    /// Perform one request and return the raw body of a 2xx answer.
    pub async fn fetch(
        &self,
        target: &Target,
        path: &str,
        method: Method,
    ) -> Result<Vec<u8>, ClientError> {
        let url = target.url(path);
        debug!(url = %url, method = %method, "Querying device");

        let mut request = self.http.request(method, &url);
        if let Some(credentials) = target.credentials() {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await.map_err(|e| request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| request_error(&url, e))?;
        trace!(url = %url, bytes = body.len(), "Device answered");

        Ok(body.to_vec())
    }

    /// Query an endpoint and decode its answer.
    pub async fn query<T: Record>(&self, target: &Target, endpoint: Endpoint) -> EndpointResult<T> {
        let body = self
            .fetch(target, self.endpoints.path(endpoint), endpoint.method())
            .await?;
        Ok(decode(&body)?)
    }
}

fn request_error(url: &str, source: reqwest::Error) -> ClientError {
    if source.is_timeout() {
        ClientError::Timeout {
            url: url.to_string(),
        }
    } else {
        ClientError::Request {
            url: url.to_string(),
            source,
        }
    }
}
