use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use curfew_core::error::CoreError;
use curfew_core::session::DeviceIdentity;
use futures::{SinkExt, StreamExt};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::ws::protocol::ControlProtocol;
use crate::ws::registry::ConnectionHandle;

pub const DEVICE_ID_HEADER: &str = "x-device-id";
pub const DEVICE_NAME_HEADER: &str = "x-device-name";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// How long the writer task gets to flush the final Close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Device identity taken from the handshake headers.
///
/// All three of `X-Device-Id`, `X-Device-Name` and `X-Real-IP` must be
/// present and non-empty; otherwise the handshake is rejected with a
/// validation error before any session exists.
#[derive(Debug, Clone)]
pub struct DeviceHandshake(pub DeviceIdentity);

impl<S: Send + Sync> FromRequestParts<S> for DeviceHandshake {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<String, AppError> {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "missing required handshake header {name}"
                    )))
                })
        };

        Ok(DeviceHandshake(DeviceIdentity {
            device_id: header(DEVICE_ID_HEADER)?,
            device_name: header(DEVICE_NAME_HEADER)?,
            ip_address: header(REAL_IP_HEADER)?,
        }))
    }
}

/// HTTP handler that upgrades a device connection to WebSocket.
///
/// Existing sessions for the device are evicted before the upgrade so the
/// new connection never coexists with a stale one.
pub async fn ws_handler(
    State(state): State<AppState>,
    DeviceHandshake(identity): DeviceHandshake,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    state
        .lifecycle
        .evict_device(&identity.device_id)
        .await?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, identity))
        .into_response())
}

/// Drive one device connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Opens the session and registers its handle.
///   2. Spawns a writer task that drains the handle's channel into the sink.
///   3. Feeds inbound text frames to the control protocol.
///   4. Tears the session down once, whichever side ends it.
async fn handle_socket(socket: WebSocket, state: AppState, identity: DeviceIdentity) {
    let (handle, mut rx) = ConnectionHandle::channel();

    let session = match state.lifecycle.open_session(identity, handle.clone()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open device session");
            return;
        }
    };
    let session_id = session.id;

    let (mut sink, mut stream) = socket.split();

    let writer_session_id = session_id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(session_id = %writer_session_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let mut protocol = ControlProtocol::new(
        session_id.clone(),
        handle.clone(),
        state.ledger.clone(),
        state.keepalive.clone(),
    );

    loop {
        let next = tokio::select! {
            () = handle.closed() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = protocol.handle_frame(text.as_str()).await {
                    tracing::debug!(session_id = %session_id, error = %e, "Dropping connection");
                    break;
                }
            }
            Some(Ok(Message::Pong(_))) => {
                tracing::trace!(session_id = %session_id, "Pong received");
                if let Err(e) = state.lifecycle.touch(&session_id).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Failed to record pong");
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(session_id = %session_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    protocol.close();
    if let Err(e) = state.lifecycle.close_connection(&session_id).await {
        tracing::error!(session_id = %session_id, error = %e, "Session teardown failed");
    }

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }
    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}
