use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::auth::error::AuthError;
use crate::auth::revocation::RevocationStore;

/// Revocation records persisted in the `jwt_blacklist` table. The `UNIQUE`
/// constraint on `signature` is what makes a second logout fail.
#[derive(Debug, Clone)]
pub struct SqliteRevocationStore {
    pool: SqlitePool,
}

impl SqliteRevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for SqliteRevocationStore {
    async fn blacklist(&self, signature: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        let result = sqlx::query("INSERT INTO jwt_blacklist (signature, expires_at) VALUES (?1, ?2)")
            .bind(signature)
            .bind(expires_at.timestamp())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!("Blacklisted signature until {}", expires_at);
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthError::AlreadyRevoked),
            Err(e) => {
                error!("Failed to blacklist signature: {}", e);
                Err(AuthError::Storage(e))
            }
        }
    }

    async fn is_blacklisted(&self, signature: &str) -> Result<bool, AuthError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM jwt_blacklist WHERE signature = ?1")
            .bind(signature)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Revocation lookup failed: {}", e);
                AuthError::Storage(e)
            })?;

        Ok(row.is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let removed = sqlx::query("DELETE FROM jwt_blacklist WHERE expires_at < ?1")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed > 0 {
            info!("Purged {} expired revocation records", removed);
        }
        Ok(removed)
    }
}
