//! Per-request authentication gate.
//!
//! Runs before any handler. Public paths pass through untouched; everything
//! else needs an `Authorization: Bearer <token>` header whose token is not
//! revoked and decodes cleanly. The decoded identity is attached to the
//! request extensions for handlers to read.

use std::collections::HashSet;
use std::sync::Arc;

use hyper::Request;
use hyper::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::auth::codec::{DecodedToken, TokenCodec};
use crate::auth::error::AuthError;
use crate::auth::revocation::RevocationStore;

const BEARER_SCHEME: &str = "bearer";

#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    store: Arc<dyn RevocationStore>,
    public_roots: HashSet<String>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("codec", &self.codec)
            .field("public_roots", &self.public_roots)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new<I, S>(codec: Arc<TokenCodec>, store: Arc<dyn RevocationStore>, public_roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codec,
            store,
            public_roots: public_roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` needs a bearer token. Only the first path segment is
    /// compared, so `/auth/login` and `/auth/anything` share the exemption
    /// of `auth` while `/authors` does not.
    pub fn requires_auth(&self, path: &str) -> bool {
        let clean = path.split('?').next().unwrap_or(path);
        let root = clean.trim_start_matches('/').split('/').next().unwrap_or("");
        !self.public_roots.contains(root)
    }

    /// Pull the token out of an `Authorization` header value.
    ///
    /// The value must be exactly `<scheme> <token>` with a single space, the
    /// scheme matching `Bearer` case-insensitively and the token non-empty.
    pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
        let value = match header {
            None => return Err(AuthError::MissingCredential),
            Some(v) if v.is_empty() => return Err(AuthError::MissingCredential),
            Some(v) => v.to_str().map_err(|_| AuthError::MalformedCredential)?,
        };

        let parts: Vec<&str> = value.split(' ').collect();
        match parts.as_slice() {
            [scheme, token] if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty() => {
                Ok(*token)
            }
            _ => Err(AuthError::MalformedCredential),
        }
    }

    /// Run the full check against a header map: extraction, revocation
    /// lookup, then decode.
    ///
    /// The revocation lookup precedes decoding so a revoked token is always
    /// reported as revoked, even once it has also expired. The well-formed
    /// check runs first so garbage never reaches the store.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<DecodedToken, AuthError> {
        let token = Self::bearer_token(headers.get(AUTHORIZATION))?;

        if !TokenCodec::is_well_formed(token) {
            return Err(AuthError::Format);
        }

        if self.store.is_blacklisted(TokenCodec::signature_of(token)).await? {
            return Err(AuthError::Revoked);
        }

        self.codec.decode(token)
    }

    /// Gate a request. On success a protected request carries its
    /// [`DecodedToken`] in the extensions; public requests are left alone.
    pub async fn admit<B>(&self, req: &mut Request<B>) -> Result<(), AuthError> {
        let path = req.uri().path();
        if !self.requires_auth(path) {
            debug!("Public path {}, skipping auth", path);
            return Ok(());
        }

        match self.authenticate(req.headers()).await {
            Ok(identity) => {
                debug!(
                    "Admitted {} {} as {}",
                    req.method(),
                    req.uri().path(),
                    identity.payload.username
                );
                req.extensions_mut().insert(identity);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
                Err(e)
            }
        }
    }
}
