//! Session row model.

use curfew_core::session::Session;
use sqlx::FromRow;

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub ip_address: String,
    pub created_at: i64,
    pub last_active: Option<i64>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            device_id: row.device_id,
            device_name: row.device_name,
            ip_address: row.ip_address,
            created_at: row.created_at,
            last_active: row.last_active,
        }
    }
}
