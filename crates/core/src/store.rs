//! Storage seams for session records and expiring keys.
//!
//! Both traits are object safe and used behind `Arc<dyn ...>` so the API
//! can run against PostgreSQL or the in-memory implementations in
//! [`crate::memory`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{require_bounded_seconds, CoreError};
use crate::session::Session;

/// Durable record of device sessions, indexed by id and by device id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite a session record.
    async fn save(&self, session: &Session) -> Result<(), CoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, CoreError>;

    async fn find_by_device_id(&self, device_id: &str) -> Result<Vec<Session>, CoreError>;

    /// Delete a session record. Unknown ids are not an error.
    async fn delete_by_id(&self, id: &str) -> Result<(), CoreError>;

    async fn find_all(&self) -> Result<Vec<Session>, CoreError>;

    /// Reachability probe for the health endpoint.
    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Key/value store whose entries expire on their own after a TTL.
///
/// Writes and reads are atomic per key; no in-process locking is layered
/// on top.
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value and TTL.
    async fn put(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CoreError>;

    /// Read a value, returning `None` once the key has expired.
    async fn get(&self, key: &str) -> Result<Option<i64>, CoreError>;

    /// Drop every key. Used at startup to discard grants and blocks that
    /// belonged to connections of a previous process.
    async fn clear(&self) -> Result<(), CoreError>;
}

/// A TTL in milliseconds, rejecting durations past
/// [`MAX_DURATION_SECS`](crate::error::MAX_DURATION_SECS).
pub fn ttl_millis(ttl: Duration) -> Result<i64, CoreError> {
    require_bounded_seconds(ttl.as_secs())?;
    i64::try_from(ttl.as_millis())
        .map_err(|_| CoreError::Validation(format!("TTL out of range: {ttl:?}")))
}
