pub mod access;
pub mod sessions;
