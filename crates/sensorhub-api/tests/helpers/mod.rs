//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use sensorhub_api::app::{build_app, serve_until};
use sensorhub_api::state::AppState;
use sensorhub_core::config::AppConfig;
use sensorhub_realtime::server::RealtimeEngine;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration with the heartbeat off and short deadlines.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.realtime.ping_interval_seconds = 0;
    config.realtime.write_timeout_ms = 1_000;
    config.server.shutdown_grace_seconds = 2;
    config
}

/// In-process application driven through `tower::ServiceExt::oneshot`.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Parsed response from a test request
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let realtime = RealtimeEngine::new(&config.realtime);
        let state = AppState::new(config, realtime);
        Self {
            router: build_app(state.clone()),
            state,
        }
    }

    pub async fn request(&self, method: &str, path: &str) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// A real server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(config: AppConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let realtime = RealtimeEngine::new(&config.realtime);
        let state = AppState::new(config, realtime);
        let (tx, rx) = oneshot::channel::<()>();

        let serve_state = state.clone();
        let task = tokio::spawn(async move {
            serve_until(listener, serve_state, async {
                let _ = rx.await;
            })
            .await
            .expect("Server failed");
        });

        Self {
            addr,
            state,
            shutdown: Some(tx),
            task,
        }
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws{}", self.addr, query)
    }

    /// Connect to `/ws`, optionally with a query string and an `Origin`.
    pub async fn connect(
        &self,
        query: &str,
        origin: Option<&str>,
    ) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
        let mut request = self.ws_url(query).into_client_request()?;
        if let Some(origin) = origin {
            request
                .headers_mut()
                .insert("Origin", HeaderValue::from_str(origin).expect("bad origin"));
        }
        tokio_tungstenite::connect_async(request)
            .await
            .map(|(stream, _)| stream)
    }

    /// Poll the coordinator until it reports `expected` connections.
    pub async fn wait_for_count(&self, expected: usize) {
        let poll = async {
            loop {
                let count = self
                    .state
                    .realtime
                    .connection_count()
                    .await
                    .expect("Coordinator stopped");
                if count == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), poll)
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for {expected} connections"));
    }

    /// Trigger graceful shutdown and wait for the server task to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("Server did not stop")
            .expect("Server task panicked");
    }
}
