//! Device control protocol.
//!
//! Devices speak a line-oriented text protocol, one command per frame:
//!
//! ```text
//! device -> server                 server -> device
//! PASSWORD:<code>                  GRANTED:<seconds> | DENIED
//! ping                             pong
//! BLOCKED                          (no reply)
//! <anything else>                  UNKNOWN_COMMAND
//! ```
//!
//! Each connection runs a small state machine: `Open` until a valid code
//! unlocks it, `Unlocked` while its keepalive runs, back to `Open` when the
//! device reports `BLOCKED`, and `Closed` once the socket goes away.

use std::fmt;
use std::sync::Arc;

use curfew_core::access::AccessLedger;
use curfew_core::error::CoreError;

use crate::ws::keepalive::KeepaliveScheduler;
use crate::ws::registry::ConnectionHandle;

const PASSWORD_PREFIX: &str = "PASSWORD:";
const BLOCKED_PREFIX: &str = "BLOCKED";

/// An inbound frame, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PASSWORD:<code>`; carries everything after the colon.
    Password(String),
    /// `ping`, any case.
    Ping,
    /// Any frame starting with `BLOCKED`.
    Blocked,
    Unknown,
}

impl Command {
    /// Parse one frame. Trailing line terminators are ignored.
    pub fn parse(frame: &str) -> Self {
        let frame = frame.trim_end_matches(['\r', '\n']);
        if let Some(code) = frame.strip_prefix(PASSWORD_PREFIX) {
            Command::Password(code.to_string())
        } else if frame.eq_ignore_ascii_case("ping") {
            Command::Ping
        } else if frame.starts_with(BLOCKED_PREFIX) {
            Command::Blocked
        } else {
            Command::Unknown
        }
    }
}

/// An outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Granted(u64),
    Denied,
    Pong,
    UnknownCommand,
    /// Pushed by an administrator's block request.
    Block(u64),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Granted(seconds) => write!(f, "GRANTED:{seconds}"),
            Reply::Denied => f.write_str("DENIED"),
            Reply::Pong => f.write_str("pong"),
            Reply::UnknownCommand => f.write_str("UNKNOWN_COMMAND"),
            Reply::Block(seconds) => write!(f, "BLOCK:{seconds}"),
        }
    }
}

/// Per-connection protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Handshake accepted, no active unlock.
    Open,
    /// A valid code was accepted and the keepalive is running.
    Unlocked,
    /// The connection is gone; further frames are ignored.
    Closed,
}

/// Interprets frames for one device connection.
pub struct ControlProtocol {
    session_id: String,
    handle: ConnectionHandle,
    ledger: Arc<AccessLedger>,
    keepalive: Arc<KeepaliveScheduler>,
    state: ProtocolState,
}

impl ControlProtocol {
    pub fn new(
        session_id: impl Into<String>,
        handle: ConnectionHandle,
        ledger: Arc<AccessLedger>,
        keepalive: Arc<KeepaliveScheduler>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            handle,
            ledger,
            keepalive,
            state: ProtocolState::Open,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Process one inbound text frame and write the reply, if any.
    ///
    /// A failed reply write cancels the session's keepalive and is returned
    /// as [`CoreError::Transport`] or [`CoreError::SessionUnavailable`].
    pub async fn handle_frame(&mut self, frame: &str) -> Result<(), CoreError> {
        if self.state == ProtocolState::Closed {
            tracing::debug!(session_id = %self.session_id, "Frame after close ignored");
            return Ok(());
        }

        tracing::info!(session_id = %self.session_id, frame, "Received frame");

        match Command::parse(frame) {
            Command::Password(code) => self.check_password(&code).await,
            Command::Ping => self.reply(Reply::Pong),
            Command::Blocked => {
                self.lock();
                Ok(())
            }
            Command::Unknown => self.reply(Reply::UnknownCommand),
        }
    }

    /// Mark the connection closed and stop its keepalive.
    pub fn close(&mut self) {
        self.keepalive.cancel(&self.session_id);
        self.state = ProtocolState::Closed;
    }

    async fn check_password(&mut self, code: &str) -> Result<(), CoreError> {
        let granted = match self.ledger.verify_grant_code(&self.session_id, code).await {
            Ok(granted) => granted,
            Err(e) => {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %e,
                    "Grant code lookup failed",
                );
                None
            }
        };

        match granted {
            Some(remaining) => {
                self.reply(Reply::Granted(remaining))?;
                self.unlock();
                Ok(())
            }
            None => self.reply(Reply::Denied),
        }
    }

    /// Enter `Unlocked`, replacing any keepalive already running.
    fn unlock(&mut self) {
        self.keepalive.start(&self.session_id, self.handle.clone());
        self.state = ProtocolState::Unlocked;
        tracing::info!(session_id = %self.session_id, "Session unlocked");
    }

    /// Return to `Open` and stop the keepalive.
    fn lock(&mut self) {
        if self.keepalive.cancel(&self.session_id) {
            tracing::info!(session_id = %self.session_id, "Device reported blocked");
        }
        self.state = ProtocolState::Open;
    }

    fn reply(&mut self, reply: Reply) -> Result<(), CoreError> {
        if let Err(e) = self.handle.send_text(reply.to_string()) {
            tracing::warn!(
                session_id = %self.session_id,
                error = %e,
                "Reply failed, stopping keepalive",
            );
            self.lock();
            return Err(e);
        }
        Ok(())
    }
}
