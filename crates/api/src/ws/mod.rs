//! Device WebSocket infrastructure.
//!
//! Provides the connection registry, the per-session keepalive scheduler,
//! the control protocol state machine, session lifecycle management and
//! the HTTP upgrade handler used by the router.

mod handler;
pub mod keepalive;
pub mod lifecycle;
pub mod protocol;
pub mod registry;

pub use handler::{ws_handler, DeviceHandshake};
pub use keepalive::KeepaliveScheduler;
pub use lifecycle::SessionLifecycle;
pub use protocol::{Command, ControlProtocol, ProtocolState, Reply};
pub use registry::{ConnectionHandle, ConnectionRegistry};
