//! Request extractors that guard the administrative API.
//!
//! - [`auth::RequireAdmin`] -- Requires the administrator password.

pub mod auth;
