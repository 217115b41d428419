use hyper::StatusCode;
use thiserror::Error;

/// Failures produced by the token lifecycle: codec, revocation store and
/// request gate.
///
/// Each variant maps to one stable problem title/detail pair. The gate never
/// recovers from any of them; they abort the request as-is.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization` header (or an empty one).
    #[error("missing credential")]
    MissingCredential,

    /// Header present but not `Bearer <token>`.
    #[error("malformed credential")]
    MalformedCredential,

    /// Token is not three well-formed segments.
    #[error("token is not a well-formed JWT")]
    Format,

    /// Signature check failed, or the header declares a non-HMAC algorithm.
    #[error("token signature could not be verified: {0}")]
    InvalidSignature(String),

    /// Correctly signed but past its `exp`.
    #[error("token expired")]
    Expired,

    /// Signature present in the revocation store.
    #[error("token revoked")]
    Revoked,

    /// The signature was already recorded by an earlier logout.
    #[error("token already revoked")]
    AlreadyRevoked,

    /// Signing failed; never caused by client input.
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("revocation store error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential
            | Self::MalformedCredential
            | Self::Format
            | Self::InvalidSignature(_)
            | Self::Expired
            | Self::Revoked => StatusCode::UNAUTHORIZED,
            Self::AlreadyRevoked => StatusCode::CONFLICT,
            Self::Signing(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingCredential => "Unauthorized user",
            Self::MalformedCredential | Self::Revoked => "Invalid authorization",
            Self::Format => "Invalid JWT",
            Self::InvalidSignature(_) => "Invalid token",
            Self::Expired => "Expired token",
            Self::AlreadyRevoked => "Token no longer used",
            Self::Signing(_) | Self::Storage(_) => "Internal Server Error",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Self::MissingCredential => {
                "The user isn't authorized because no Authorization header is provided"
            }
            Self::MalformedCredential => {
                "The Authorization header provided has an unknown format... Try: Bearer <token>"
            }
            Self::Format => "The provided token doesn't have JWT format",
            Self::InvalidSignature(_) => "The provided token signature could not be verified",
            Self::Expired => "Your token has expired, please try logging in again",
            Self::Revoked => "The provided token has expired after logging out",
            Self::AlreadyRevoked => "The provided token is no longer in use",
            Self::Signing(_) | Self::Storage(_) => "An unknown error has occurred",
        }
    }
}
