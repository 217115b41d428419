pub mod revocation;
pub mod users;
pub mod utils;

pub use revocation::SqliteRevocationStore;
pub use users::{DirectoryError, UserDirectory};

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use shared::types::server_config::DatabaseConfig;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        id            TEXT PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at    INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS jwt_blacklist (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        signature  TEXT NOT NULL UNIQUE,
        expires_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_jwt_blacklist_expires_at ON jwt_blacklist(expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at)",
];

/// Open the pool described by `config`, creating the database file if needed.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    info!("Connected to {}", config.url);
    Ok(pool)
}

/// Create tables and indexes. Idempotent.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema ready");
    Ok(())
}

/// Single-connection in-memory pool with the schema applied. Every
/// connection to `:memory:` is a fresh database, so the pool is pinned to one
/// connection that never expires.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}
