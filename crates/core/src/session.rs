//! Device session model.

use serde::{Deserialize, Serialize};

use crate::types::{EpochMillis, SessionId};

/// One logical device connection.
///
/// Created when a device completes the handshake and removed when the
/// connection closes, is deleted by an administrator, or is superseded by a
/// reconnection from the same device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub device_id: String,
    pub device_name: String,
    pub ip_address: String,
    pub created_at: EpochMillis,
    /// Last transport-level pong, absent until the first one arrives.
    pub last_active: Option<EpochMillis>,
}

/// Identity a device presents in its handshake headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub device_name: String,
    pub ip_address: String,
}

impl Session {
    /// Build a fresh session record for a newly accepted connection.
    pub fn new(id: SessionId, identity: DeviceIdentity, created_at: EpochMillis) -> Self {
        Self {
            id,
            device_id: identity.device_id,
            device_name: identity.device_name,
            ip_address: identity.ip_address,
            created_at,
            last_active: None,
        }
    }
}

/// Sort sessions newest first.
pub fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
