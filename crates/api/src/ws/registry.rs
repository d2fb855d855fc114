use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use curfew_core::error::CoreError;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Channel receiver half drained by the connection's writer task.
pub type WsReceiver = mpsc::UnboundedReceiver<Message>;

/// Sendable reference to one live device connection.
///
/// Cheap to clone; every clone addresses the same socket. Writes are pushed
/// onto an unbounded channel and performed by the connection's writer task,
/// so sending never blocks on network I/O.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    sender: WsSender,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle plus the receiver its writer task should drain.
    pub fn channel() -> (Self, WsReceiver) {
        let (sender, rx) = mpsc::unbounded_channel();
        let handle = Self {
            inner: Arc::new(HandleInner {
                sender,
                closed: CancellationToken::new(),
            }),
        };
        (handle, rx)
    }

    /// True until the handle is closed or its writer task goes away.
    pub fn is_open(&self) -> bool {
        !self.inner.closed.is_cancelled() && !self.inner.sender.is_closed()
    }

    /// Queue a text frame.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), CoreError> {
        let text: String = text.into();
        self.send(Message::Text(text.into()))
    }

    /// Queue a transport-level ping frame.
    pub fn ping(&self) -> Result<(), CoreError> {
        self.send(Message::Ping(Bytes::new()))
    }

    /// Queue a Close frame and mark the handle closed. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.is_cancelled() {
            return;
        }
        let _ = self.inner.sender.send(Message::Close(None));
        self.inner.closed.cancel();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await;
    }

    fn send(&self, message: Message) -> Result<(), CoreError> {
        if self.inner.closed.is_cancelled() {
            return Err(CoreError::SessionUnavailable(
                "connection is closed".into(),
            ));
        }
        self.inner
            .sender
            .send(message)
            .map_err(|_| CoreError::Transport("connection writer has stopped".into()))
    }
}

/// Live connection handles indexed by session id.
///
/// Backed by a sharded concurrent map, so operations on different sessions
/// do not contend on a single lock. No method holds a shard guard while
/// writing to a connection.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under `session_id`.
    ///
    /// An existing handle for the same id is replaced without being closed.
    pub fn register(&self, session_id: impl Into<String>, handle: ConnectionHandle) {
        self.connections.insert(session_id.into(), handle);
    }

    /// Remove a session's handle, closing it if it is still open.
    ///
    /// Returns the removed handle; `None` means another caller already
    /// removed it (or it was never registered).
    pub fn remove(&self, session_id: &str) -> Option<ConnectionHandle> {
        let (_, handle) = self.connections.remove(session_id)?;
        if handle.is_open() {
            handle.close();
        }
        Some(handle)
    }

    /// Clone of the handle registered for `session_id`.
    pub fn get(&self, session_id: &str) -> Option<ConnectionHandle> {
        self.connections
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    /// Send a text frame to a session.
    ///
    /// Fails with [`CoreError::SessionUnavailable`] when no open handle is
    /// registered, and with [`CoreError::Transport`] when the write fails.
    pub fn send(&self, session_id: &str, text: &str) -> Result<(), CoreError> {
        // Clone out of the map so the shard guard is released before the write.
        let handle = self
            .get(session_id)
            .filter(ConnectionHandle::is_open)
            .ok_or_else(|| {
                CoreError::SessionUnavailable(format!(
                    "no open connection for session {session_id}"
                ))
            })?;

        handle.send_text(text).inspect_err(|e| {
            tracing::error!(session_id, error = %e, "Failed to send frame");
        })
    }

    /// Whether `session_id` has an open handle.
    pub fn is_open(&self, session_id: &str) -> bool {
        self.connections
            .get(session_id)
            .is_some_and(|entry| entry.is_open())
    }

    /// Return the current number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection and clear the registry.
    ///
    /// Used during graceful shutdown.
    pub fn shutdown_all(&self) {
        let ids: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        let count = ids.len();
        for id in ids {
            self.remove(&id);
        }
        tracing::info!(count, "Closed all device connections");
    }
}
