use std::sync::Arc;

use curfew_core::clock::Clock;
use curfew_core::error::CoreError;
use curfew_core::session::{DeviceIdentity, Session};
use curfew_core::store::SessionStore;

use crate::ws::keepalive::KeepaliveScheduler;
use crate::ws::registry::{ConnectionHandle, ConnectionRegistry};

/// Creates and tears down device sessions.
///
/// Ties the session store, the connection registry and the keepalive
/// scheduler together so that a session's record, handle and keepalive
/// task come and go as one unit.
pub struct SessionLifecycle {
    sessions: Arc<dyn SessionStore>,
    registry: Arc<ConnectionRegistry>,
    keepalive: Arc<KeepaliveScheduler>,
    clock: Arc<dyn Clock>,
}

impl SessionLifecycle {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        registry: Arc<ConnectionRegistry>,
        keepalive: Arc<KeepaliveScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            registry,
            keepalive,
            clock,
        }
    }

    /// Tear down every session recorded for `device_id`.
    ///
    /// Returns the number of sessions evicted.
    pub async fn evict_device(&self, device_id: &str) -> Result<usize, CoreError> {
        let existing = self.sessions.find_by_device_id(device_id).await?;
        let mut evicted = 0;
        for session in existing {
            self.delete_session(&session.id).await?;
            tracing::info!(
                session_id = %session.id,
                device_id,
                "Evicted previous session for device",
            );
            evicted += 1;
        }
        Ok(evicted)
    }

    /// Record a freshly upgraded connection as a new session.
    ///
    /// The handle is registered before the record is saved, so any record a
    /// racing handshake can see already has its handle in place. Once saved,
    /// the device's sessions are settled so that only the newest survives;
    /// if this one has already been superseded it is torn down again and
    /// its handle closed.
    pub async fn open_session(
        &self,
        identity: DeviceIdentity,
        handle: ConnectionHandle,
    ) -> Result<Session, CoreError> {
        let id = uuid::Uuid::now_v7().to_string();
        let session = Session::new(id, identity, self.clock.now_millis());

        self.registry.register(session.id.clone(), handle);
        if let Err(e) = self.sessions.save(&session).await {
            self.registry.remove(&session.id);
            return Err(e);
        }

        tracing::info!(
            session_id = %session.id,
            device_id = %session.device_id,
            device_name = %session.device_name,
            ip_address = %session.ip_address,
            "Device session opened",
        );

        if let Err(e) = self.settle_device(&session).await {
            tracing::warn!(
                session_id = %session.id,
                device_id = %session.device_id,
                error = %e,
                "Failed to evict previous sessions",
            );
        }
        Ok(session)
    }

    /// Keep only the newest live session of `session`'s device.
    ///
    /// Sessions are ordered by `(created_at, id)`; UUIDv7 ids break ties in
    /// creation order. Every caller sees the same order, so concurrent
    /// handshakes from one device agree on a single survivor.
    async fn settle_device(&self, session: &Session) -> Result<(), CoreError> {
        let others: Vec<Session> = self
            .sessions
            .find_by_device_id(&session.device_id)
            .await?
            .into_iter()
            .filter(|other| other.id != session.id)
            .collect();

        // A record whose handle is gone is already being torn down.
        let superseded = others
            .iter()
            .any(|other| is_newer(other, session) && self.registry.get(&other.id).is_some());
        if superseded {
            self.close_connection(&session.id).await?;
            tracing::info!(
                session_id = %session.id,
                device_id = %session.device_id,
                "Session superseded by a newer connection",
            );
            return Ok(());
        }

        for other in others.iter().filter(|other| !is_newer(other, session)) {
            self.delete_session(&other.id).await?;
            tracing::info!(
                session_id = %other.id,
                device_id = %other.device_id,
                "Evicted previous session for device",
            );
        }
        Ok(())
    }

    /// Tear down a session whose connection has ended.
    ///
    /// Only the caller that actually removes the handle from the registry
    /// performs the teardown, so it runs once per connection no matter how
    /// many paths observe the close. Returns whether this call did it.
    pub async fn close_connection(&self, session_id: &str) -> Result<bool, CoreError> {
        if self.registry.remove(session_id).is_none() {
            return Ok(false);
        }
        self.keepalive.cancel(session_id);
        self.sessions.delete_by_id(session_id).await?;
        tracing::info!(session_id, "Device session closed");
        Ok(true)
    }

    /// Remove a session regardless of whether its connection is live.
    ///
    /// Closes the connection if one is registered and always deletes the
    /// stored record.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), CoreError> {
        if !self.close_connection(session_id).await? {
            self.keepalive.cancel(session_id);
            self.sessions.delete_by_id(session_id).await?;
            tracing::debug!(session_id, "Deleted session record without live connection");
        }
        Ok(())
    }

    /// Remove every session. Returns how many records were deleted.
    pub async fn delete_all_sessions(&self) -> Result<usize, CoreError> {
        let all = self.sessions.find_all().await?;
        for session in &all {
            self.delete_session(&session.id).await?;
        }
        tracing::info!(count = all.len(), "Deleted all sessions");
        Ok(all.len())
    }

    /// Record a transport-level pong as liveness proof.
    ///
    /// Ignored when the session is gone, so a late pong cannot bring a
    /// deleted record back. Teardown removes the handle before deleting the
    /// record, so a save that lands after the handle is gone is undone.
    pub async fn touch(&self, session_id: &str) -> Result<(), CoreError> {
        if self.registry.get(session_id).is_none() {
            return Ok(());
        }
        let Some(mut session) = self.sessions.find_by_id(session_id).await? else {
            return Ok(());
        };
        session.last_active = Some(self.clock.now_millis());
        self.sessions.save(&session).await?;

        if self.registry.get(session_id).is_none() {
            self.sessions.delete_by_id(session_id).await?;
            tracing::debug!(session_id, "Dropped pong for session closed mid-update");
        }
        Ok(())
    }
}

/// True when `a` was created after `b`.
fn is_newer(a: &Session, b: &Session) -> bool {
    (a.created_at, a.id.as_str()) > (b.created_at, b.id.as_str())
}
