/// Wall-clock time as milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// Transport-assigned connection identifier (UUIDv7 string).
pub type SessionId = String;
