//! Administrative device operations.
//!
//! Grants, blocks and session management as called by the HTTP handlers.
//! Durations arrive as signed integers from JSON and are validated here.

use std::sync::Arc;

use curfew_core::access::AccessLedger;
use curfew_core::error::{require_positive_seconds, CoreError};
use curfew_core::session::{sort_newest_first, Session};
use curfew_core::store::SessionStore;

use crate::ws::lifecycle::SessionLifecycle;
use crate::ws::protocol::Reply;
use crate::ws::registry::ConnectionRegistry;

pub struct DeviceControl {
    sessions: Arc<dyn SessionStore>,
    registry: Arc<ConnectionRegistry>,
    ledger: Arc<AccessLedger>,
    lifecycle: Arc<SessionLifecycle>,
}

impl DeviceControl {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        registry: Arc<ConnectionRegistry>,
        ledger: Arc<AccessLedger>,
        lifecycle: Arc<SessionLifecycle>,
    ) -> Self {
        Self {
            sessions,
            registry,
            ledger,
            lifecycle,
        }
    }

    /// Issue a grant code for the device's live session.
    ///
    /// The code is handed back to the administrator, who passes it on to the
    /// person at the device out of band.
    pub async fn grant_time_for_device(
        &self,
        device_id: &str,
        seconds: i64,
    ) -> Result<String, CoreError> {
        let seconds = require_positive_seconds(seconds)?;
        let session = self.live_session(device_id).await?;
        let code = self.ledger.issue_grant_code(&session.id, seconds).await?;
        tracing::info!(device_id, session_id = %session.id, seconds, "Grant code generated");
        Ok(code)
    }

    /// Push an unconditional grant straight to the device.
    pub async fn grant_access(&self, device_id: &str, seconds: i64) -> Result<u64, CoreError> {
        let seconds = require_positive_seconds(seconds)?;
        let session = self.live_session(device_id).await?;
        self.registry
            .send(&session.id, &Reply::Granted(seconds).to_string())?;
        tracing::info!(device_id, session_id = %session.id, seconds, "Access granted");
        Ok(seconds)
    }

    /// Start a block window for the device and tell it to lock.
    ///
    /// The block record is written before the push, so a failed push leaves
    /// the window in force and is reported to the caller.
    pub async fn block_device(&self, device_id: &str, seconds: i64) -> Result<u64, CoreError> {
        let seconds = require_positive_seconds(seconds)?;
        let session = self.live_session(device_id).await?;
        self.ledger.block_device(device_id, seconds).await?;
        self.registry
            .send(&session.id, &Reply::Block(seconds).to_string())?;
        tracing::info!(device_id, session_id = %session.id, seconds, "Device blocked");
        Ok(seconds)
    }

    pub async fn remaining_block_time(&self, device_id: &str) -> Result<Option<u64>, CoreError> {
        self.ledger.remaining_block_time(device_id).await
    }

    /// All session records, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, CoreError> {
        let mut sessions = self.sessions.find_all().await?;
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    /// Delete one session, closing its connection if it is live.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), CoreError> {
        let known = self.registry.get(session_id).is_some()
            || self.sessions.find_by_id(session_id).await?.is_some();
        if !known {
            return Err(CoreError::NotFound {
                entity: "Session",
                id: session_id.to_string(),
            });
        }
        self.lifecycle.delete_session(session_id).await
    }

    pub async fn delete_all_sessions(&self) -> Result<usize, CoreError> {
        self.lifecycle.delete_all_sessions().await
    }

    /// Newest session for the device that still has an open connection.
    async fn live_session(&self, device_id: &str) -> Result<Session, CoreError> {
        let mut sessions = self.sessions.find_by_device_id(device_id).await?;
        sort_newest_first(&mut sessions);
        sessions
            .into_iter()
            .find(|s| self.registry.is_open(&s.id))
            .ok_or_else(|| CoreError::NotFound {
                entity: "Device session",
                id: device_id.to_string(),
            })
    }
}
