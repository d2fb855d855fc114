//! PostgreSQL implementations of the core storage traits.

use std::time::Duration;

use async_trait::async_trait;
use curfew_core::error::CoreError;
use curfew_core::session::Session;
use curfew_core::store::{ttl_millis, SessionStore, TtlStore};

use crate::repositories::{SessionRepo, TtlKeyRepo};
use crate::DbPool;

fn store_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Store(err.to_string())
}

/// [`SessionStore`] backed by the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, session: &Session) -> Result<(), CoreError> {
        SessionRepo::upsert(&self.pool, session)
            .await
            .map_err(store_error)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, CoreError> {
        let row = SessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(row.map(Session::from))
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Vec<Session>, CoreError> {
        let rows = SessionRepo::find_by_device_id(&self.pool, device_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), CoreError> {
        SessionRepo::delete(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Session>, CoreError> {
        let rows = SessionRepo::list(&self.pool).await.map_err(store_error)?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }
}

/// [`TtlStore`] backed by the `ttl_keys` table.
#[derive(Clone)]
pub struct PgTtlStore {
    pool: DbPool,
}

impl PgTtlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TtlStore for PgTtlStore {
    async fn put(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CoreError> {
        let millis = ttl_millis(ttl)?;
        let purged = TtlKeyRepo::purge_expired(&self.pool)
            .await
            .map_err(store_error)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired keys");
        }
        TtlKeyRepo::upsert(&self.pool, key, value, millis)
            .await
            .map_err(store_error)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CoreError> {
        TtlKeyRepo::find_live(&self.pool, key)
            .await
            .map_err(store_error)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        TtlKeyRepo::delete_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
