//! Domain core for the curfew device-control service.
//!
//! Holds everything that does not depend on the transport or on a concrete
//! database: the clock abstraction, the session model, the storage traits
//! (with in-memory implementations) and the access code ledger.

pub mod access;
pub mod clock;
pub mod error;
pub mod memory;
pub mod session;
pub mod store;
pub mod types;
