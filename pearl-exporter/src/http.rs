//! HTTP server for the probe and metrics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use pearl_device::{ClientError, Credentials, DeviceConfig, Target};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::config::{ExporterConfig, ServerConfig};
use crate::exposition::{self, CONTENT_TYPE};
use crate::mapping::{self, MetricSnapshot};
use crate::probe::{ProbeOptions, Prober};

/// Header in which Prometheus advertises its scrape timeout.
const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    prober: Arc<Prober>,
    config: Arc<ExporterConfig>,
}

/// Query parameters of a probe request.
#[derive(Debug, Default, Deserialize)]
pub struct ProbeParams {
    pub target: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub channel: Option<String>,
}

/// A probe request that failed validation.
#[derive(Debug, Error)]
pub enum ProbeRequestError {
    #[error("Target parameter is missing")]
    MissingTarget,
    #[error("Target parameter is invalid: {0}")]
    InvalidTarget(#[from] ClientError),
}

/// A validated probe request.
#[derive(Debug)]
pub struct ProbeRequest {
    pub target: Target,
    pub channels: Vec<String>,
}

impl ProbeParams {
    /// Validate the parameters, falling back to the static device settings
    /// for credentials and channel selection.
    pub fn into_request(self, device: &DeviceConfig) -> Result<ProbeRequest, ProbeRequestError> {
        let address = non_empty(self.target).ok_or(ProbeRequestError::MissingTarget)?;

        let username = non_empty(self.user).or_else(|| device.username.clone());
        let password = self.password.or_else(|| device.password.clone());
        let credentials =
            username.map(|user| Credentials::new(user, password.unwrap_or_default()));

        let target = Target::parse(&address)?.with_credentials(credentials);

        let channels = match non_empty(self.channel) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
            None => device.channels.clone(),
        };

        Ok(ProbeRequest { target, channels })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Probe budget: the configured device timeout, shortened to fit the
/// scraper's own timeout when it advertises one.
fn probe_timeout(headers: &HeaderMap, server: &ServerConfig, device: &DeviceConfig) -> Duration {
    let configured = Duration::from_secs(device.timeout_secs);

    let advertised = headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|secs| secs - server.timeout_offset_secs)
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    match advertised {
        Some(scrape) => scrape.min(configured),
        None => configured,
    }
}

/// Create the HTTP router.
fn create_router(prober: Arc<Prober>, config: Arc<ExporterConfig>) -> Router {
    let probe_path = config.server.probe_path.clone();
    let metrics_path = config.server.metrics_path.clone();
    let state = AppState { prober, config };

    Router::new()
        .route("/", get(index_handler))
        .route(&probe_path, get(probe_handler))
        .route(&metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the probe endpoint.
async fn probe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ProbeParams>,
) -> Response {
    let request = match params.into_request(&state.config.device) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected probe request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let options = ProbeOptions {
        timeout: probe_timeout(&headers, &state.config.server, &state.config.device),
        channels: request.channels,
    };

    let result = state.prober.probe(&request.target, &options).await;
    render(&mapping::map_probe(&result), &state.config.metrics.namespace)
}

/// Handler for the exporter's own metrics.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    render(&mapping::build_info(), &state.config.metrics.namespace)
}

fn render(snapshot: &MetricSnapshot, namespace: &str) -> Response {
    match exposition::encode(snapshot, namespace) {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Handler for the landing page.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let server = &state.config.server;
    Html(format!(
        r#"<html>
<head><title>Pearl Exporter</title></head>
<body>
<h1>Pearl Exporter</h1>
<p><a href="{probe}?target=pearl.local">Probe pearl.local for Epiphan Pearl metrics</a></p>
<p><a href="{metrics}">Metrics</a></p>
</body>
</html>
"#,
        probe = server.probe_path.trim_start_matches('/'),
        metrics = server.metrics_path.trim_start_matches('/'),
    ))
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    prober: Arc<Prober>,
    config: Arc<ExporterConfig>,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(prober: Arc<Prober>, config: Arc<ExporterConfig>, listen_addr: SocketAddr) -> Self {
        Self {
            prober,
            config,
            listen_addr,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let probe_path = self.config.server.probe_path.clone();
        let router = create_router(self.prober, self.config);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %probe_path,
            "HTTP server listening"
        );

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use pearl_device::DeviceClient;
    use tower::ServiceExt;

    fn make_router(config: ExporterConfig) -> Router {
        let client = DeviceClient::new(&config.device).unwrap();
        let prober = Arc::new(Prober::new(client, &config.device));
        create_router(prober, Arc::new(config))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_probe_without_target() {
        let router = make_router(ExporterConfig::default());

        let response = router
            .oneshot(Request::get("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Target parameter is missing"));
    }

    #[tokio::test]
    async fn test_probe_with_empty_target() {
        let router = make_router(ExporterConfig::default());

        let response = router
            .oneshot(Request::get("/probe?target=").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Target parameter is missing"));
    }

    #[tokio::test]
    async fn test_probe_with_invalid_target() {
        let router = make_router(ExporterConfig::default());

        let response = router
            .oneshot(
                Request::get("/probe?target=ftp://pearl.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let router = make_router(ExporterConfig::default());

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("openmetrics-text"));
        assert!(body_string(response).await.contains("pearl_exporter_build_info"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = make_router(ExporterConfig::default());

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_links_probe_path() {
        let mut config = ExporterConfig::default();
        config.server.probe_path = "/pearl/probe".to_string();
        let router = make_router(config);

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("pearl/probe?target="));
    }

    #[test]
    fn test_params_fall_back_to_device_config() {
        let device = DeviceConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            channels: vec!["2".to_string()],
            ..Default::default()
        };
        let params = ProbeParams {
            target: Some("pearl.local".to_string()),
            ..Default::default()
        };

        let request = params.into_request(&device).unwrap();

        assert_eq!(request.target.address(), "http://pearl.local");
        assert_eq!(
            request.target.credentials(),
            Some(&Credentials::new("admin", "secret"))
        );
        assert_eq!(request.channels, vec!["2"]);
    }

    #[test]
    fn test_params_override_device_config() {
        let device = DeviceConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            channels: vec!["2".to_string()],
            ..Default::default()
        };
        let params = ProbeParams {
            target: Some("https://10.0.0.5".to_string()),
            user: Some("operator".to_string()),
            password: Some("pw".to_string()),
            channel: Some("1, 3".to_string()),
        };

        let request = params.into_request(&device).unwrap();

        assert_eq!(
            request.target.credentials(),
            Some(&Credentials::new("operator", "pw"))
        );
        assert_eq!(request.channels, vec!["1", "3"]);
    }

    #[test]
    fn test_params_without_credentials() {
        let params = ProbeParams {
            target: Some("pearl.local".to_string()),
            ..Default::default()
        };

        let request = params.into_request(&DeviceConfig::default()).unwrap();
        assert!(request.target.credentials().is_none());
    }

    #[test]
    fn test_probe_timeout_from_header() {
        let server = ServerConfig::default();
        let device = DeviceConfig::default();

        let mut headers = HeaderMap::new();
        assert_eq!(
            probe_timeout(&headers, &server, &device),
            Duration::from_secs(10)
        );

        headers.insert(SCRAPE_TIMEOUT_HEADER, "4".parse().unwrap());
        assert_eq!(
            probe_timeout(&headers, &server, &device),
            Duration::from_secs_f64(3.5)
        );

        // Never longer than the configured timeout
        headers.insert(SCRAPE_TIMEOUT_HEADER, "60".parse().unwrap());
        assert_eq!(
            probe_timeout(&headers, &server, &device),
            Duration::from_secs(10)
        );

        // Unusable values are ignored
        for value in ["0.2", "1e300", "inf", "NaN", "-3", "soon"] {
            headers.insert(SCRAPE_TIMEOUT_HEADER, value.parse().unwrap());
            assert_eq!(
                probe_timeout(&headers, &server, &device),
                Duration::from_secs(10),
                "header value {}",
                value
            );
        }
    }
}
