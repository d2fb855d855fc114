//! Query functions, one repository per table.

mod session_repo;
mod ttl_key_repo;

pub use session_repo::SessionRepo;
pub use ttl_key_repo::TtlKeyRepo;
