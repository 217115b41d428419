use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;

/// Current time as whole Unix seconds.
pub fn get_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Fresh identifier for a directory entry.
pub fn generate_user_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Hash a password with Argon2id and a random salt. The result is a PHC
/// string that embeds its own parameters.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))
}

/// Verify a password against its stored hash.
pub fn verify_password(hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
