use std::sync::Arc;
use std::time::Duration;

use curfew_core::access::AccessLedger;
use curfew_core::clock::Clock;
use curfew_core::store::{SessionStore, TtlStore};

use crate::config::ServerConfig;
use crate::control::DeviceControl;
use crate::ws::{ConnectionRegistry, KeepaliveScheduler, SessionLifecycle};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Durable session records.
    pub sessions: Arc<dyn SessionStore>,
    /// Expiring keys backing grant codes and block windows.
    pub ttl_store: Arc<dyn TtlStore>,
    pub ledger: Arc<AccessLedger>,
    /// Live device connections by session id.
    pub registry: Arc<ConnectionRegistry>,
    pub keepalive: Arc<KeepaliveScheduler>,
    pub lifecycle: Arc<SessionLifecycle>,
    /// Administrative operations used by the HTTP handlers.
    pub control: Arc<DeviceControl>,
}

impl AppState {
    /// Wire every component on top of the given stores and clock.
    pub fn new(
        config: ServerConfig,
        sessions: Arc<dyn SessionStore>,
        ttl_store: Arc<dyn TtlStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = Arc::new(AccessLedger::new(Arc::clone(&ttl_store), Arc::clone(&clock)));
        let registry = Arc::new(ConnectionRegistry::new());
        let keepalive = Arc::new(KeepaliveScheduler::new(Duration::from_secs(
            config.keepalive_interval_secs,
        )));
        let lifecycle = Arc::new(SessionLifecycle::new(
            Arc::clone(&sessions),
            Arc::clone(&registry),
            Arc::clone(&keepalive),
            clock,
        ));
        let control = Arc::new(DeviceControl::new(
            Arc::clone(&sessions),
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::clone(&lifecycle),
        ));

        Self {
            config: Arc::new(config),
            sessions,
            ttl_store,
            ledger,
            registry,
            keepalive,
            lifecycle,
            control,
        }
    }
}
