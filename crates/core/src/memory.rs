//! In-memory store implementations.
//!
//! Used when no `DATABASE_URL` is configured and throughout the tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::session::Session;
use crate::store::{ttl_millis, SessionStore, TtlStore};
use crate::types::EpochMillis;

/// Session records held in a concurrent map.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), CoreError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, CoreError> {
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Vec<Session>, CoreError> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.device_id == device_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), CoreError> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Session>, CoreError> {
        Ok(self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// A stored value together with its absolute expiry.
#[derive(Debug, Clone, Copy)]
struct Expiring {
    value: i64,
    expires_at: EpochMillis,
}

/// Expiring keys held in a concurrent map.
///
/// Expiry is evaluated against the injected [`Clock`]. An expired entry is
/// removed when it is read after its deadline, and every write sweeps the
/// entries that have expired since, so unread keys do not pile up.
pub struct MemoryTtlStore {
    entries: DashMap<String, Expiring>,
    clock: Arc<dyn Clock>,
}

impl MemoryTtlStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }
}

#[async_trait]
impl TtlStore for MemoryTtlStore {
    async fn put(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CoreError> {
        let now = self.clock.now_millis();
        let expires_at = now
            .checked_add(ttl_millis(ttl)?)
            .ok_or_else(|| CoreError::Validation(format!("TTL out of range: {ttl:?}")))?;

        self.entries.retain(|_, entry| entry.expires_at > now);
        self.entries
            .insert(key.to_string(), Expiring { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CoreError> {
        let now = self.clock.now_millis();
        // remove_if holds the shard lock, so a concurrent put is not lost.
        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value))
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.entries.clear();
        Ok(())
    }
}
