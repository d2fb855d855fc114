//! Repository for the `sessions` table.

use curfew_core::session::Session;
use sqlx::PgPool;

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, device_id, device_name, ip_address, created_at, last_active";

/// Provides CRUD operations for device sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a session, or overwrite every column if the id already exists.
    pub async fn upsert(pool: &PgPool, session: &Session) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, device_id, device_name, ip_address, created_at, last_active)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                device_id = EXCLUDED.device_id,
                device_name = EXCLUDED.device_name,
                ip_address = EXCLUDED.ip_address,
                created_at = EXCLUDED.created_at,
                last_active = EXCLUDED.last_active",
        )
        .bind(&session.id)
        .bind(&session.device_id)
        .bind(&session.device_name)
        .bind(&session.ip_address)
        .bind(session.created_at)
        .bind(session.last_active)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a session by its id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all sessions for a device, newest first.
    pub async fn find_by_device_id(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<Vec<SessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions WHERE device_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(device_id)
            .fetch_all(pool)
            .await
    }

    /// List every session, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions ORDER BY created_at DESC");
        sqlx::query_as::<_, SessionRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Delete a session. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
