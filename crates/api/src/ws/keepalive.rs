use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ws::registry::ConnectionHandle;

/// Default interval between keepalive pings (in seconds).
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 60;

/// Bookkeeping for one session's recurring probe.
struct KeepaliveTask {
    /// Distinguishes this task from a later one started for the same id.
    generation: u64,
    cancel: CancellationToken,
    /// Serialises "check cancelled, then ping" against [`KeepaliveTask::stop`].
    gate: Arc<Mutex<()>>,
}

impl KeepaliveTask {
    /// Cancel the task. Once this returns the task sends no further pings.
    fn stop(&self) {
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancel.cancel();
    }
}

enum ProbeOutcome {
    Sent,
    Cancelled,
    Dead(String),
}

/// Per-session keepalive scheduler.
///
/// Each unlocked session gets one lightweight tokio task that pings the
/// device on a fixed interval (first ping immediately). All tasks share the
/// runtime's timer; there is no thread per connection.
pub struct KeepaliveScheduler {
    tasks: Arc<DashMap<String, KeepaliveTask>>,
    interval: Duration,
    next_generation: AtomicU64,
}

impl KeepaliveScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            interval,
            next_generation: AtomicU64::new(0),
        }
    }

    /// Start pinging `handle` on behalf of `session_id`.
    ///
    /// Any task already running for the session is cancelled first, so at
    /// most one task per session is ever active.
    pub fn start(&self, session_id: &str, handle: ConnectionHandle) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let gate = Arc::new(Mutex::new(()));

        let task = KeepaliveTask {
            generation,
            cancel: cancel.clone(),
            gate: Arc::clone(&gate),
        };
        if let Some(previous) = self.tasks.insert(session_id.to_string(), task) {
            previous.stop();
            tracing::debug!(session_id, "Replaced running keepalive task");
        }

        tracing::debug!(
            session_id,
            interval_secs = self.interval.as_secs(),
            "Keepalive started",
        );

        let tasks = Arc::clone(&self.tasks);
        let session_id = session_id.to_string();
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match probe(&gate, &cancel, &handle) {
                    ProbeOutcome::Sent => {
                        tracing::trace!(session_id = %session_id, "Keepalive ping sent");
                    }
                    ProbeOutcome::Cancelled => break,
                    ProbeOutcome::Dead(reason) => {
                        tracing::info!(
                            session_id = %session_id,
                            reason = %reason,
                            "Keepalive probe failed, stopping task",
                        );
                        tasks.remove_if(&session_id, |_, t| t.generation == generation);
                        cancel.cancel();
                        break;
                    }
                }
            }
        });
    }

    /// Cancel the session's keepalive task, if any.
    ///
    /// Idempotent. Returns `true` if a task was running.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.tasks.remove(session_id) {
            Some((_, task)) => {
                task.stop();
                tracing::debug!(session_id, "Keepalive cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a keepalive task is currently registered for the session.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.tasks.contains_key(session_id)
    }

    /// Number of sessions with a running keepalive task.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel every task. Used during graceful shutdown.
    pub fn shutdown(&self) {
        let ids: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for id in &ids {
            self.cancel(id);
        }
        tracing::info!(count = ids.len(), "Keepalive tasks stopped");
    }
}

impl Default for KeepaliveScheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_KEEPALIVE_INTERVAL_SECS))
    }
}

/// One liveness probe. Cancellation is re-checked under the gate so a
/// concurrent [`KeepaliveScheduler::cancel`] always wins.
fn probe(gate: &Mutex<()>, cancel: &CancellationToken, handle: &ConnectionHandle) -> ProbeOutcome {
    let _guard = gate.lock().unwrap_or_else(PoisonError::into_inner);
    if cancel.is_cancelled() {
        return ProbeOutcome::Cancelled;
    }
    if !handle.is_open() {
        return ProbeOutcome::Dead("connection closed".into());
    }
    match handle.ping() {
        Ok(()) => ProbeOutcome::Sent,
        Err(e) => ProbeOutcome::Dead(e.to_string()),
    }
}
