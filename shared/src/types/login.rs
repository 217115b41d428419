use serde::{Deserialize, Serialize};

use crate::types::user::User;

// ---------------------------------------------------------------------------
// Login wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginData {
    #[serde(rename = "emailOrUsername", alias = "email_or_username", alias = "username")]
    pub email_or_username: String,
    pub password: String,
}

/// Body returned by every issuing operation (login and registration).
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Directory-facing fields only.
    pub data: User,
    /// Signed JWT; send it back as `Authorization: Bearer <token>`.
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

/// The token named here is revoked; it does not have to match the caller's
/// own credential header (logout is an open route).
#[derive(Debug, Deserialize)]
pub struct LogoutData {
    pub token: String,
}
