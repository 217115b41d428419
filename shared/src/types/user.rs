use serde::{Deserialize, Serialize};

/// Directory-facing view of an account.
///
/// This is the identity payload embedded in every token. It never carries the
/// password hash, so it is safe to hand back to clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier (UUID v4) assigned when the account is created.
    pub id: String,
    pub username: String,
    pub email: String,
}
