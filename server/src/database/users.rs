//! The user directory: account creation, credential checks and lookups.

use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use tracing::{error, info, warn};

use shared::types::User;

use crate::database::utils::{generate_user_id, get_timestamp, hash_password, verify_password};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("username or email already in use")]
    AlreadyExists,

    #[error("user {0} not found")]
    NotFound(String),

    /// Unknown identifier or wrong password; deliberately not told apart.
    #[error("credentials don't match")]
    BadCredentials,

    #[error("password hashing failed: {0}")]
    Hash(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
        }
    }
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account. Uniqueness of username and email is left to the
    /// table constraints.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DirectoryError> {
        let password_hash = hash_password(password)?;
        let id = generate_user_id();

        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(get_timestamp())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("New user made! {}", username);
                Ok(User {
                    id,
                    username: username.to_string(),
                    email: email.to_string(),
                })
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!("Registration conflict for {}", username);
                Err(DirectoryError::AlreadyExists)
            }
            Err(e) => {
                error!("Failed to create user {}: {}", username, e);
                Err(DirectoryError::Storage(e))
            }
        }
    }

    async fn find_with_password(
        &self,
        email_or_username: &str,
    ) -> Result<Option<CredentialRow>, DirectoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, email, password_hash FROM users
             WHERE username = ?1 OR email = ?1
             LIMIT 1",
        )
        .bind(email_or_username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Check a password against the account named by username or email.
    pub async fn login(&self, email_or_username: &str, password: &str) -> Result<User, DirectoryError> {
        let row = self
            .find_with_password(email_or_username)
            .await?
            .ok_or_else(|| {
                warn!("Login for unknown user {}", email_or_username);
                DirectoryError::BadCredentials
            })?;

        if !verify_password(&row.password_hash, password)? {
            warn!("Invalid password for user: {}", row.username);
            return Err(DirectoryError::BadCredentials);
        }

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
        })
    }

    pub async fn get_user(&self, username: &str) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, email FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| DirectoryError::NotFound(username.to_string()))
    }

    /// Every account, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email FROM users ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
