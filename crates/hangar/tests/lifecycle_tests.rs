//! Server lifecycle tests over a real TCP listener.

use std::time::Duration;

use tokio::sync::oneshot;

use hangar::error::ServerError;
use hangar::{Config, HangarServer};

fn local_config() -> Config {
    Config::from_vars([
        ("HOST", "127.0.0.1"),
        ("PORT", "0"),
        ("SHUTDOWN_TIMEOUT_SECS", "1"),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_serves_until_shutdown() {
    let server = HangarServer::new(local_config());
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_starts_without_providers() {
    let config = local_config();
    assert!(config.providers.is_empty());

    let server = HangarServer::new(config);
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{addr}/auth/github")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port().to_string();

    let config = Config::from_vars([("HOST", "127.0.0.1"), ("PORT", port.as_str())]).unwrap();
    let err = HangarServer::new(config).bind().await.unwrap_err();

    assert!(matches!(err, ServerError::Bind { .. }));
    assert!(err.to_string().contains(&port));
}
