use serde::{Deserialize, Serialize};

use crate::types::user::User;

/// Claims embedded in every JWT issued by the server.
///
/// The token is self-contained: the server keeps no per-token state apart
/// from the revocation list, which is keyed by the token's signature segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Identity payload. Immutable once signed.
    pub payload: User,

    /// Issued-at (Unix timestamp, seconds, UTC).
    pub iat: i64,

    /// Standard JWT expiry (Unix timestamp, seconds, UTC).
    pub exp: i64,
}
