//! Bearer-token auth server: issues tokens on login and registration, gates
//! every protected request on them and revokes them on logout.

pub mod auth;
pub mod database;
pub mod error;
pub mod handlers;
pub mod tower_middle;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{error, info};

use shared::types::server_config::{AppConfig, MAX_TOKEN_LIFETIME_MINUTES};

use crate::auth::{AuthGate, RevocationStore, SessionLifecycle, TokenCodec};
use crate::database::{SqliteRevocationStore, UserDirectory};

/// Everything a handler can reach. Cheap to clone: all members are handles.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserDirectory,
    pub sessions: SessionLifecycle,
    pub gate: AuthGate,
}

impl AppState {
    /// State backed by SQLite for both users and revocations.
    pub fn new(config: AppConfig, pool: SqlitePool) -> Result<Self> {
        let store: Arc<dyn RevocationStore> = Arc::new(SqliteRevocationStore::new(pool.clone()));
        Self::with_store(config, pool, store)
    }

    /// State with a caller-supplied revocation store. The signing secret is
    /// resolved from the environment and the config.
    pub fn with_store(
        config: AppConfig,
        pool: SqlitePool,
        store: Arc<dyn RevocationStore>,
    ) -> Result<Self> {
        let secret = config.auth.resolved_jwt_secret();
        Self::with_resolved_secret(config, pool, store, secret)
    }

    fn with_resolved_secret(
        config: AppConfig,
        pool: SqlitePool,
        store: Arc<dyn RevocationStore>,
        secret: Option<String>,
    ) -> Result<Self> {
        let secret = secret.context("No JWT secret configured")?;
        Self::with_secret(config, pool, store, secret.as_bytes())
    }

    /// State signing with an explicit `secret`; the environment is not read.
    pub fn with_secret(
        config: AppConfig,
        pool: SqlitePool,
        store: Arc<dyn RevocationStore>,
        secret: &[u8],
    ) -> Result<Self> {
        let lifetime = Some(config.auth.token_lifetime_minutes)
            .filter(|minutes| *minutes <= MAX_TOKEN_LIFETIME_MINUTES)
            .and_then(|_| config.auth.token_lifetime_secs())
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .context("Token lifetime out of range")?;

        let codec = Arc::new(TokenCodec::new(secret, lifetime));
        let gate = AuthGate::new(
            codec.clone(),
            store.clone(),
            config.auth.public_paths.iter().cloned(),
        );

        Ok(Self {
            config: Arc::new(config),
            users: UserDirectory::new(pool),
            sessions: SessionLifecycle::new(codec, store),
            gate,
        })
    }
}

/// Periodically delete revocation records whose token has expired anyway.
/// Returns `None` when `every` is zero.
pub fn spawn_revocation_sweep(
    store: Arc<dyn RevocationStore>,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        info!("Revocation sweep disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = store.purge_expired(chrono::Utc::now()).await {
                error!("Revocation sweep failed: {}", e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryRevocationStore;
    use chrono::Utc;
    use shared::types::server_config::{
        AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig,
    };

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn config(lifetime_minutes: u64) -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
            auth: AuthConfig {
                token_lifetime_minutes: lifetime_minutes,
                jwt_secret: None,
                public_paths: vec!["auth".into(), "health".into()],
                revocation_sweep_secs: 0,
            },
            logging: LoggingConfig::default(),
        }
    }

    fn memory_store() -> Arc<dyn RevocationStore> {
        Arc::new(MemoryRevocationStore::new())
    }

    #[tokio::test]
    async fn state_uses_configured_lifetime() {
        let pool = database::memory_pool().await.unwrap();
        let state = AppState::with_secret(config(5), pool, memory_store(), SECRET).unwrap();
        assert_eq!(state.sessions.codec().lifetime().num_seconds(), 300);
        assert!(!state.gate.requires_auth("/auth/login"));
    }

    #[tokio::test]
    async fn missing_secret_is_an_error() {
        let pool = database::memory_pool().await.unwrap();
        let err = AppState::with_resolved_secret(config(5), pool, memory_store(), None).unwrap_err();
        assert!(err.to_string().contains("No JWT secret"));
    }

    #[tokio::test]
    async fn unrepresentable_lifetime_is_an_error() {
        for minutes in [
            MAX_TOKEN_LIFETIME_MINUTES + 1,
            200_000_000_000,
            u64::MAX / 60,
            u64::MAX,
        ] {
            let pool = database::memory_pool().await.unwrap();
            assert!(
                AppState::with_secret(config(minutes), pool, memory_store(), SECRET).is_err(),
                "{} minutes",
                minutes
            );
        }
    }

    #[tokio::test]
    async fn zero_interval_disables_sweep() {
        assert!(spawn_revocation_sweep(memory_store(), Duration::ZERO).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_purges_expired_records() {
        let memory = Arc::new(MemoryRevocationStore::new());
        memory
            .blacklist("old", Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();
        memory
            .blacklist("live", Utc::now() + chrono::Duration::minutes(5))
            .await
            .unwrap();

        let handle = spawn_revocation_sweep(memory.clone(), Duration::from_secs(60)).unwrap();

        // Let the task take its immediate first tick, then move the clock
        // past one interval.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(61)).await;
        for _ in 0..10 {
            if !memory.is_blacklisted("old").await.unwrap() {
                break;
            }
            tokio::task::yield_now().await;
        }
        handle.abort();

        assert!(!memory.is_blacklisted("old").await.unwrap());
        assert!(memory.is_blacklisted("live").await.unwrap());
    }
}
