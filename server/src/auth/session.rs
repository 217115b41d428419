//! Issue-on-login and revoke-on-logout.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use shared::types::{AuthResponse, User};

use crate::auth::codec::TokenCodec;
use crate::auth::error::AuthError;
use crate::auth::revocation::RevocationStore;

#[derive(Clone)]
pub struct SessionLifecycle {
    codec: Arc<TokenCodec>,
    store: Arc<dyn RevocationStore>,
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl SessionLifecycle {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn RevocationStore>) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Sign a token for an identity that has just proven its credentials or
    /// been created.
    pub fn issue(&self, user: User) -> Result<AuthResponse, AuthError> {
        let signed = self.codec.sign(&user)?;
        info!("Issued token for {} valid until {}", user.username, signed.expires_at);

        Ok(AuthResponse {
            expires_in: (signed.expires_at - signed.issued_at).num_seconds().max(0) as u64,
            data: user,
            token: signed.token,
        })
    }

    /// Revoke `token` until its own expiry.
    ///
    /// The token must still decode: a forged, malformed or already expired
    /// token fails with the codec's classification and nothing is written.
    /// Returns the expiry recorded for the signature.
    pub async fn revoke(&self, token: &str) -> Result<DateTime<Utc>, AuthError> {
        let decoded = self.codec.decode(token)?;
        let signature = TokenCodec::signature_of(token);

        match self.store.blacklist(signature, decoded.expires_at).await {
            Ok(()) => {
                info!("Revoked token for {}", decoded.payload.username);
                Ok(decoded.expires_at)
            }
            Err(e) => {
                warn!("Revocation for {} failed: {}", decoded.payload.username, e);
                Err(e)
            }
        }
    }
}
