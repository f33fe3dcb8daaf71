//! WebSocket upgrade handler.

use std::net::SocketAddr;

use axum::Extension;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use tracing::warn;

use sensorhub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, serde::Deserialize)]
pub struct WsQuery {
    /// Shared access token, required when `realtime.access_token` is set.
    pub token: Option<String>,
}

/// GET /ws?token={token}: WebSocket upgrade
///
/// Clients only receive; anything they send is ignored. The token check and
/// the origin policy both run before the upgrade, so a rejected client gets
/// a plain HTTP error and never joins the registry.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let remote_addr = connect_info.map(|Extension(ConnectInfo(addr))| addr);

    if let Some(expected) = state.config.realtime.access_token.as_deref() {
        if query.token.as_deref() != Some(expected) {
            warn!(remote_addr = ?remote_addr, "WebSocket upgrade rejected: bad access token");
            return Err(AppError::authentication("Invalid or missing access token").into());
        }
    }

    Ok(state.realtime.upgrade(ws, &headers, remote_addr)?)
}
