//! Signing and verification of identity payloads.
//!
//! Tokens are compact JWTs (`header.payload.signature`) signed with a single
//! process-wide HMAC secret. Decoding is layered so every failure gets its
//! own classification:
//!
//! 1. structural check (three URL-safe segments), no crypto
//! 2. algorithm guard: the header must declare an HMAC algorithm
//! 3. signature verification
//! 4. expiry, checked only once the signature is known to be good

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use shared::types::{JwtClaims, User};

use crate::auth::error::AuthError;

/// Lifetime used when the configuration does not override it.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 5 * 60;

/// Algorithms accepted on decode. Anything else, `none` included, is a
/// verification failure regardless of the signature bytes.
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Algorithm used when signing.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

const SEGMENT_DELIMITER: char = '.';

/// A freshly signed token plus the timestamps embedded in it.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The verified contents of a token. This is what the gate attaches to a
/// request once it has been admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub payload: User,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("lifetime_secs", &self.lifetime.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = HMAC_FAMILY.to_vec();
        // Expiry is enforced by `decode_at` after the signature check so that
        // an expired token is reported as expired, not as invalid.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign `payload` with `iat = now` and `exp = iat + lifetime`.
    pub fn sign(&self, payload: &User) -> Result<SignedToken, AuthError> {
        self.sign_at(payload, Utc::now())
    }

    /// Sign with an explicit issue time. Timestamps are truncated to whole
    /// seconds, so two calls with the same payload and second produce the
    /// same token.
    pub fn sign_at(&self, payload: &User, issued_at: DateTime<Utc>) -> Result<SignedToken, AuthError> {
        let iat = issued_at.timestamp();
        let exp = iat + self.lifetime.num_seconds();

        let claims = JwtClaims {
            payload: payload.clone(),
            iat,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        debug!("Signed token for user id {}", payload.id);

        Ok(SignedToken {
            token,
            issued_at: from_unix(iat).ok_or_else(|| AuthError::Signing("iat out of range".into()))?,
            expires_at: from_unix(exp).ok_or_else(|| AuthError::Signing("exp out of range".into()))?,
        })
    }

    /// Structural check: exactly three non-empty segments, each restricted to
    /// `[A-Za-z0-9_-]`.
    pub fn is_well_formed(token: &str) -> bool {
        let mut segments = 0;
        for segment in token.split(SEGMENT_DELIMITER) {
            segments += 1;
            if segments > 3 || segment.is_empty() {
                return false;
            }
            if !segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
            {
                return false;
            }
        }
        segments == 3
    }

    /// The substring after the last delimiter. Used as the revocation key.
    pub fn signature_of(token: &str) -> &str {
        match token.rfind(SEGMENT_DELIMITER) {
            Some(idx) => &token[idx + 1..],
            None => token,
        }
    }

    pub fn decode(&self, token: &str) -> Result<DecodedToken, AuthError> {
        self.decode_at(token, Utc::now())
    }

    /// Decode and verify `token` as if the current time were `now`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<DecodedToken, AuthError> {
        if !Self::is_well_formed(token) {
            return Err(AuthError::Format);
        }

        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

        if !HMAC_FAMILY.contains(&header.alg) {
            return Err(AuthError::InvalidSignature(format!(
                "unexpected signing method: {:?}",
                header.alg
            )));
        }

        let claims = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }

        let issued_at = from_unix(claims.iat)
            .ok_or_else(|| AuthError::InvalidSignature("iat out of range".into()))?;
        let expires_at = from_unix(claims.exp)
            .ok_or_else(|| AuthError::InvalidSignature("exp out of range".into()))?;

        Ok(DecodedToken {
            payload: claims.payload,
            issued_at,
            expires_at,
        })
    }
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use proptest::prelude::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    fn segments(token: &str) -> Vec<&str> {
        token.split('.').collect()
    }

    #[test]
    fn sign_then_decode_returns_payload() {
        let codec = codec();
        let before = Utc::now().timestamp();
        let signed = codec.sign(&user("u1")).unwrap();
        let decoded = codec.decode(&signed.token).unwrap();

        assert_eq!(decoded.payload, user("u1"));
        assert!(decoded.issued_at.timestamp() >= before);
        assert!(decoded.issued_at <= Utc::now());
        assert!(Utc::now() <= decoded.expires_at);
        assert_eq!(decoded.expires_at - decoded.issued_at, Duration::seconds(300));
    }

    #[test]
    fn signed_token_is_well_formed() {
        let signed = codec().sign(&user("u1")).unwrap();
        assert!(TokenCodec::is_well_formed(&signed.token));
        assert_eq!(segments(&signed.token).len(), 3);
    }

    #[test]
    fn same_payload_and_time_give_same_signature() {
        let codec = codec();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let a = codec.sign_at(&user("u1"), at).unwrap();
        let b = codec.sign_at(&user("u1"), at).unwrap();
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn different_issue_times_give_different_signatures() {
        let codec = codec();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let a = codec.sign_at(&user("u1"), at).unwrap();
        let b = codec.sign_at(&user("u1"), at + Duration::seconds(1)).unwrap();
        assert_ne!(TokenCodec::signature_of(&a.token), TokenCodec::signature_of(&b.token));
    }

    #[test]
    fn token_expired_one_second_ago_is_expired_not_invalid() {
        let codec = codec();
        let issued = Utc::now() - Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS + 1);
        let signed = codec.sign_at(&user("u1"), issued).unwrap();
        assert!(signed.expires_at < Utc::now());

        let err = codec.decode(&signed.token).unwrap_err();
        assert!(matches!(err, AuthError::Expired), "got {:?}", err);
    }

    #[test]
    fn token_is_expired_exactly_at_exp() {
        let codec = codec();
        let signed = codec.sign(&user("u1")).unwrap();
        let just_before = signed.expires_at - Duration::seconds(1);

        assert!(codec.decode_at(&signed.token, just_before).is_ok());
        assert!(matches!(
            codec.decode_at(&signed.token, signed.expires_at),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn zero_or_two_segments_fail_with_format_error() {
        let codec = codec();
        for bad in ["abc", "abc.def", "", "a..b", ".a.b", "a.b.", "a.b.c.d", "a.b.c!", "a.b c.d"] {
            assert!(
                matches!(codec.decode(bad), Err(AuthError::Format)),
                "expected format error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn well_formed_garbage_fails_verification_not_format() {
        let err = codec().decode("abc.def.ghi").unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature(_)), "got {:?}", err);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenCodec::new(b"another-secret-another-secret-xx", Duration::minutes(5));
        let signed = other.sign(&user("u1")).unwrap();
        assert!(matches!(
            codec().decode(&signed.token),
            Err(AuthError::InvalidSignature(_))
        ));
    }

    #[test]
    fn none_algorithm_is_rejected() {
        let signed = codec().sign(&user("u1")).unwrap();
        let parts = segments(&signed.token);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{}.{}.{}", header, parts[1], parts[2]);

        assert!(matches!(
            codec().decode(&forged),
            Err(AuthError::InvalidSignature(_))
        ));
    }

    #[test]
    fn non_hmac_algorithm_is_rejected_before_verification() {
        let signed = codec().sign(&user("u1")).unwrap();
        let parts = segments(&signed.token);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let forged = format!("{}.{}.{}", header, parts[1], parts[2]);

        let err = codec().decode(&forged).unwrap_err();
        match err {
            AuthError::InvalidSignature(reason) => assert!(reason.contains("RS256")),
            other => panic!("expected InvalidSignature, got {:?}", other),
        }
    }

    #[test]
    fn other_hmac_strength_with_same_secret_is_accepted() {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            payload: user("u1"),
            iat: now,
            exp: now + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec().decode(&token).unwrap().payload, user("u1"));
    }

    #[test]
    fn swapped_payload_fails_verification() {
        let codec = codec();
        let a = codec.sign(&user("u1")).unwrap();
        let b = codec.sign(&user("u2")).unwrap();
        let a_parts = segments(&a.token);
        let b_parts = segments(&b.token);
        let forged = format!("{}.{}.{}", a_parts[0], b_parts[1], a_parts[2]);

        assert!(matches!(
            codec.decode(&forged),
            Err(AuthError::InvalidSignature(_))
        ));
    }

    #[test]
    fn signature_is_text_after_last_dot() {
        assert_eq!(TokenCodec::signature_of("h.p.sig"), "sig");
        assert_eq!(TokenCodec::signature_of("nodots"), "nodots");
        assert_eq!(TokenCodec::signature_of("h.p."), "");
    }

    #[test]
    fn debug_output_hides_key_material() {
        let out = format!("{:?}", codec());
        assert!(!out.contains("0123456789abcdef"));
    }

    proptest! {
        #[test]
        fn round_trip_preserves_any_payload(
            id in "[a-zA-Z0-9-]{1,36}",
            username in "\\PC{1,40}",
            email in "\\PC{1,60}",
        ) {
            let codec = codec();
            let payload = User { id, username, email };
            let signed = codec.sign(&payload).unwrap();
            let decoded = codec.decode(&signed.token).unwrap();
            prop_assert_eq!(decoded.payload, payload);
            prop_assert!(decoded.issued_at <= decoded.expires_at);
        }

        #[test]
        fn flipping_any_signature_character_fails_verification(offset in 0usize..43) {
            let codec = codec();
            let signed = codec.sign(&user("u1")).unwrap();
            let sig_start = signed.token.rfind('.').unwrap() + 1;
            let idx = sig_start + offset % (signed.token.len() - sig_start);

            let mut bytes = signed.token.clone().into_bytes();
            bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            let result = codec.decode(&tampered);
            prop_assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
        }
    }
}
