//! Connection lifecycle: upgrade handshake, registration, and the read loop
//! that detects when a client goes away.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::http::HeaderMap;
use axum::http::header::ORIGIN;
use axum::response::Response;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use sensorhub_core::config::RealtimeConfig;
use sensorhub_core::error::AppError;
use sensorhub_core::result::AppResult;

use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;
use super::heartbeat::{HeartbeatConfig, run_heartbeat};
use super::manager::ConnectionManager;
use super::origin::OriginPolicy;
use super::transport::WsTransport;

/// Per-connection timing settings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Deadline for a single write.
    pub write_timeout: Duration,
    /// Heartbeat interval, if enabled.
    pub ping_interval: Option<Duration>,
}

impl From<&RealtimeConfig> for ConnectionSettings {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            write_timeout: Duration::from_millis(config.write_timeout_ms),
            ping_interval: (config.ping_interval_seconds > 0)
                .then(|| Duration::from_secs(config.ping_interval_seconds)),
        }
    }
}

/// Everything a freshly upgraded socket needs to join the registry.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Coordinator handle.
    pub manager: ConnectionManager,
    /// Shared counters.
    pub metrics: Arc<RealtimeMetrics>,
    /// Timing settings.
    pub settings: ConnectionSettings,
}

/// Validate the handshake and, if accepted, finish the upgrade.
///
/// The origin policy is evaluated once. A rejected request never produces a
/// connection; the error goes back to the HTTP caller only.
pub fn upgrade(
    ws: WebSocketUpgrade,
    headers: &HeaderMap,
    remote_addr: Option<SocketAddr>,
    policy: &OriginPolicy,
    ctx: ConnectionContext,
) -> AppResult<Response> {
    let origin = match headers.get(ORIGIN) {
        None => None,
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::authorization("Origin header is not valid UTF-8"))?,
        ),
    };

    if !policy.allows(origin) {
        warn!(origin = ?origin, remote_addr = ?remote_addr, "WebSocket origin rejected");
        return Err(AppError::authorization("Origin not allowed"));
    }
    debug!(origin = ?origin, "WebSocket origin accepted");

    Ok(ws
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| serve_socket(socket, remote_addr, ctx)))
}

/// Drive one upgraded socket from registration to unregistration.
pub async fn serve_socket(
    socket: WebSocket,
    remote_addr: Option<SocketAddr>,
    ctx: ConnectionContext,
) {
    let (sink, stream) = socket.split();
    let conn = Arc::new(ConnectionHandle::new(remote_addr, Box::new(WsTransport::new(sink))));

    if let Err(e) = ctx.manager.register(Arc::clone(&conn)).await {
        warn!(conn_id = %conn.id, error = %e, "Could not register connection");
        conn.close(ctx.settings.write_timeout);
        return;
    }

    if let Some(ping_interval) = ctx.settings.ping_interval {
        tokio::spawn(run_heartbeat(
            Arc::clone(&conn),
            HeartbeatConfig {
                ping_interval,
                write_timeout: ctx.settings.write_timeout,
            },
            ctx.manager.clone(),
            Arc::clone(&ctx.metrics),
        ));
    }

    match read_until_closed(&conn, stream).await {
        ReadOutcome::PeerClosed { code, expected: true } => {
            info!(
                conn_id = %conn.id,
                remote_addr = %conn.peer(),
                code = ?code,
                "Client closed connection"
            );
        }
        ReadOutcome::PeerClosed { code, expected: false } => {
            warn!(
                conn_id = %conn.id,
                remote_addr = %conn.peer(),
                code = ?code,
                "Client closed connection unexpectedly"
            );
        }
        ReadOutcome::StreamEnded => {
            info!(
                conn_id = %conn.id,
                remote_addr = %conn.peer(),
                "Connection stream ended"
            );
        }
        ReadOutcome::LocallyClosed => {
            debug!(conn_id = %conn.id, "Read loop stopped after local close");
        }
        ReadOutcome::Failed(error) => {
            warn!(
                conn_id = %conn.id,
                remote_addr = %conn.peer(),
                error = %error,
                "Unexpected WebSocket read error"
            );
        }
    }

    ctx.manager.unregister(conn.id).await;
}

/// Why the read loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// The peer sent a close frame.
    PeerClosed { code: Option<u16>, expected: bool },
    /// The stream ended without a close frame.
    StreamEnded,
    /// The connection was closed on our side first.
    LocallyClosed,
    /// The transport reported an error.
    Failed(String),
}

/// Read and discard frames until the peer goes away or the connection is
/// closed locally.
pub(crate) async fn read_until_closed<S>(conn: &ConnectionHandle, mut stream: S) -> ReadOutcome
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = conn.closed() => return ReadOutcome::LocallyClosed,
            next = stream.next() => match next {
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map(|f| f.code);
                    return ReadOutcome::PeerClosed {
                        code,
                        expected: is_expected_close(frame.as_ref()),
                    };
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return ReadOutcome::Failed(e.to_string()),
                None => return ReadOutcome::StreamEnded,
            },
        }
    }
}

fn is_expected_close(frame: Option<&CloseFrame>) -> bool {
    match frame {
        None => true,
        Some(frame) => matches!(
            frame.code,
            close_code::NORMAL | close_code::AWAY | close_code::ABNORMAL
        ),
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::connection::transport::memory::MemoryTransport;

    fn conn() -> Arc<ConnectionHandle> {
        Arc::new(ConnectionHandle::new(None, Box::new(MemoryTransport::new())))
    }

    fn close(code: u16) -> Message {
        Message::Close(Some(CloseFrame {
            code,
            reason: "bye".into(),
        }))
    }

    #[tokio::test]
    async fn test_inbound_payloads_are_ignored() {
        let frames = vec![
            Ok(Message::Text("hello".into())),
            Ok(Message::Binary(vec![1u8, 2, 3].into())),
            Ok(Message::Pong(Default::default())),
            Ok(close(close_code::NORMAL)),
        ];
        let outcome = read_until_closed(&conn(), stream::iter(frames)).await;
        assert_eq!(
            outcome,
            ReadOutcome::PeerClosed {
                code: Some(close_code::NORMAL),
                expected: true
            }
        );
    }

    #[tokio::test]
    async fn test_close_code_classification() {
        for (code, expected) in [
            (close_code::NORMAL, true),
            (close_code::AWAY, true),
            (close_code::ABNORMAL, true),
            (close_code::ERROR, false),
            (close_code::POLICY, false),
        ] {
            let outcome = read_until_closed(&conn(), stream::iter(vec![Ok(close(code))])).await;
            assert_eq!(
                outcome,
                ReadOutcome::PeerClosed {
                    code: Some(code),
                    expected
                }
            );
        }

        let frames = vec![Ok(Message::Close(None))];
        let outcome = read_until_closed(&conn(), stream::iter(frames)).await;
        assert_eq!(
            outcome,
            ReadOutcome::PeerClosed {
                code: None,
                expected: true
            }
        );
    }

    #[tokio::test]
    async fn test_stream_end_and_error() {
        let outcome = read_until_closed(&conn(), stream::iter(Vec::new())).await;
        assert_eq!(outcome, ReadOutcome::StreamEnded);

        let frames = vec![Err(axum::Error::new(std::io::Error::other("reset")))];
        let outcome = read_until_closed(&conn(), stream::iter(frames)).await;
        assert!(matches!(outcome, ReadOutcome::Failed(msg) if msg.contains("reset")));
    }

    #[tokio::test]
    async fn test_local_close_stops_pending_read() {
        let conn = conn();
        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move {
                read_until_closed(&conn, stream::pending::<Result<Message, axum::Error>>()).await
            })
        };

        conn.close(Duration::from_secs(1));
        let outcome = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ReadOutcome::LocallyClosed);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = ConnectionSettings::from(&RealtimeConfig {
            write_timeout_ms: 750,
            ping_interval_seconds: 0,
            ..RealtimeConfig::default()
        });
        assert_eq!(settings.write_timeout, Duration::from_millis(750));
        assert!(settings.ping_interval.is_none());

        let settings = ConnectionSettings::from(&RealtimeConfig::default());
        assert_eq!(settings.ping_interval, Some(Duration::from_secs(30)));
    }
}
