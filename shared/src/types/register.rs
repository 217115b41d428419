use serde::Deserialize;

/// Registration request data (supports both form-encoded and JSON)
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationData {
    pub username: String,
    pub email: String,
    pub password: String,
}
