//! Access code ledger: short-lived grant codes and device block windows.
//!
//! Both record kinds live in a [`TtlStore`] as an absolute deadline in
//! epoch milliseconds, with a store TTL equal to the requested duration.
//! Reads recompute the remaining whole seconds against the [`Clock`], so a
//! record that the store has not yet evicted but whose deadline has passed
//! still reads as absent.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::clock::Clock;
use crate::error::{require_bounded_seconds, CoreError};
use crate::store::{ttl_millis, TtlStore};
use crate::types::EpochMillis;

/// Smallest grant code handed out.
pub const GRANT_CODE_MIN: u32 = 100_000;

/// Largest grant code handed out.
pub const GRANT_CODE_MAX: u32 = 999_999;

const GRANT_KEY_PREFIX: &str = "time_grant";
const BLOCK_KEY_PREFIX: &str = "block_device";

/// Store key for a grant code scoped to one session.
pub fn grant_key(session_id: &str, code: &str) -> String {
    format!("{GRANT_KEY_PREFIX}:{session_id}:{code}")
}

/// Store key for a device block window.
pub fn block_key(device_id: &str) -> String {
    format!("{BLOCK_KEY_PREFIX}:{device_id}")
}

/// Whole seconds left until `deadline`, or `None` if it has passed.
pub fn remaining_seconds(deadline: EpochMillis, now: EpochMillis) -> Option<u64> {
    let remaining = deadline - now;
    if remaining > 0 {
        Some((remaining / 1000) as u64)
    } else {
        None
    }
}

/// Issues and verifies grant codes and device blocks.
pub struct AccessLedger {
    store: Arc<dyn TtlStore>,
    clock: Arc<dyn Clock>,
}

impl AccessLedger {
    pub fn new(store: Arc<dyn TtlStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Issue a 6-digit code that unlocks `session_id` for `seconds`.
    ///
    /// Codes are random, not unique: two sessions may hold the same code at
    /// once, which is harmless because verification is keyed by session.
    pub async fn issue_grant_code(
        &self,
        session_id: &str,
        seconds: u64,
    ) -> Result<String, CoreError> {
        let ttl = positive_ttl(seconds)?;
        let code = rand::rng()
            .random_range(GRANT_CODE_MIN..=GRANT_CODE_MAX)
            .to_string();
        let deadline = self.deadline(ttl)?;

        self.store
            .put(&grant_key(session_id, &code), deadline, ttl)
            .await?;

        tracing::debug!(session_id, seconds, "Grant code issued");
        Ok(code)
    }

    /// Check a code presented by `session_id`.
    ///
    /// Returns the whole seconds left on the grant. The record is left in
    /// place, so the same code verifies again until it expires.
    pub async fn verify_grant_code(
        &self,
        session_id: &str,
        code: &str,
    ) -> Result<Option<u64>, CoreError> {
        let deadline = self.store.get(&grant_key(session_id, code)).await?;
        Ok(deadline.and_then(|d| remaining_seconds(d, self.clock.now_millis())))
    }

    /// Put `device_id` under a block window of `seconds`, replacing any
    /// window already in force.
    pub async fn block_device(&self, device_id: &str, seconds: u64) -> Result<(), CoreError> {
        let ttl = positive_ttl(seconds)?;
        let deadline = self.deadline(ttl)?;
        self.store.put(&block_key(device_id), deadline, ttl).await
    }

    /// Seconds left in the device's block window, if one is in force.
    pub async fn remaining_block_time(&self, device_id: &str) -> Result<Option<u64>, CoreError> {
        let deadline = self.store.get(&block_key(device_id)).await?;
        Ok(deadline.and_then(|d| remaining_seconds(d, self.clock.now_millis())))
    }

    fn deadline(&self, ttl: Duration) -> Result<EpochMillis, CoreError> {
        self.clock
            .now_millis()
            .checked_add(ttl_millis(ttl)?)
            .ok_or_else(|| CoreError::Validation("deadline out of range".into()))
    }
}

fn positive_ttl(seconds: u64) -> Result<Duration, CoreError> {
    if seconds == 0 {
        return Err(CoreError::Validation(
            "seconds must be greater than 0".into(),
        ));
    }
    Ok(Duration::from_secs(require_bounded_seconds(seconds)?))
}
