//! Repository for the `ttl_keys` table.
//!
//! Expiry is evaluated by PostgreSQL (`expires_at > NOW()`); expired rows
//! are swept opportunistically on write.

use sqlx::PgPool;

/// Provides expiring key/value operations.
pub struct TtlKeyRepo;

impl TtlKeyRepo {
    /// Insert or replace a key with a fresh TTL in milliseconds.
    pub async fn upsert(
        pool: &PgPool,
        key: &str,
        value: i64,
        ttl_millis: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO ttl_keys (key, value, expires_at)
             VALUES ($1, $2, NOW() + make_interval(secs => $3::double precision / 1000))
             ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(ttl_millis)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Read a live (unexpired) value.
    pub async fn find_live(pool: &PgPool, key: &str) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT value FROM ttl_keys WHERE key = $1 AND expires_at > NOW()")
                .bind(key)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Delete expired rows. Returns the count of deleted rows.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ttl_keys WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every row.
    pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ttl_keys").execute(pool).await?;
        Ok(result.rows_affected())
    }
}
