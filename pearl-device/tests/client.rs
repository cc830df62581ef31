//! Integration tests for the device client against an in-process mock device.

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use pearl_device::{
    ClientError, Credentials, DeviceClient, DeviceConfig, Endpoint, EndpointError,
    FirmwareUpdate, FirmwareVersion, StorageStatus, Target,
};

/// Serve a router on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> DeviceClient {
    DeviceClient::new(&DeviceConfig::default()).unwrap()
}

#[tokio::test]
async fn test_query_decodes_record() {
    let base = serve(Router::new().route(
        "/api/system/firmware/version",
        get(|| async { r#"{"status":"ok","result":"4.14.2"}"# }),
    ))
    .await;

    let target = Target::parse(&base).unwrap();
    let version: FirmwareVersion = client()
        .query(&target, Endpoint::FirmwareVersion)
        .await
        .unwrap();

    assert_eq!(version.version, "4.14.2");
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let base = serve(Router::new().route(
        "/api/system/storages/main/status",
        get(|headers: HeaderMap| async move {
            match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                // admin:secret
                Some("Basic YWRtaW46c2VjcmV0") => (
                    StatusCode::OK,
                    r#"{"status":"ok","result":{"total":1000,"free":400}}"#,
                ),
                _ => (StatusCode::UNAUTHORIZED, r#"{"status":"error"}"#),
            }
        }),
    ))
    .await;

    let client = client();
    let anonymous = Target::parse(&base).unwrap();
    let authed = anonymous
        .clone()
        .with_credentials(Some(Credentials::new("admin", "secret")));

    let storage: StorageStatus = client
        .query(&authed, Endpoint::StorageStatus)
        .await
        .unwrap();
    assert_eq!(storage.free, 400.0);

    let err = client
        .query::<StorageStatus>(&anonymous, Endpoint::StorageStatus)
        .await
        .unwrap_err();
    match err {
        EndpointError::Transport(e) => assert_eq!(e.status(), Some(401)),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_check_uses_post() {
    let base = serve(Router::new().route(
        "/api/system/firmware/update/control/check",
        post(|| async { r#"{"status":"ok","result":{"status":"no_updates","changed":false}}"# }),
    ))
    .await;

    let target = Target::parse(&base).unwrap();
    let update: FirmwareUpdate = client()
        .query(&target, Endpoint::FirmwareUpdate)
        .await
        .unwrap();

    assert_eq!(update.status, "no_updates");
}

#[tokio::test]
async fn test_decode_error_is_reported() {
    let base = serve(Router::new().route(
        "/api/system/storages/main/status",
        get(|| async { r#"{"status":"ok","result":{"total":1000}}"# }),
    ))
    .await;

    let target = Target::parse(&base).unwrap();
    let err = client()
        .query::<StorageStatus>(&target, Endpoint::StorageStatus)
        .await
        .unwrap_err();

    assert!(matches!(err, EndpointError::Decode(_)));
    assert!(err.to_string().contains("free"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let target = Target::parse(&format!("http://{}", addr)).unwrap();
    let err = client()
        .fetch(&target, "/api/system/status", reqwest::Method::GET)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Request { .. }));
    assert_eq!(err.status(), None);
}
