//! Stateless signed session tokens.
//!
//! A session is a self-contained HS256 JWT carrying only an opaque
//! account id and its issue/expiry timestamps. Validity is determined
//! entirely by signature verification plus the expiry check, with no
//! database lookup, and no server-side revocation state. Expiry is
//! fixed at issue time (`exp = iat + ttl`); there is no rolling
//! refresh. Claims are authenticated, not encrypted: nothing secret
//! ever goes into them.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject, the opaque account id.
    pub sub: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp), fixed at issue time.
    pub exp: i64,
}

/// Mints and verifies session tokens with a server-held secret.
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SessionSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs: ttl.as_secs() as i64,
        }
    }

    /// Issue a signed token for an account.
    ///
    /// The compact JWT serialization uses only the base64url alphabet
    /// and `.`, so it is safe for cookie transport without further
    /// encoding.
    pub fn sign(&self, account_id: &str) -> Result<String> {
        self.sign_at(account_id, Utc::now().timestamp())
    }

    fn sign_at(&self, account_id: &str, now: i64) -> Result<String> {
        let claims = SessionClaims {
            sub: account_id.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::TokenEncoding(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// Rejects tampering and malformed structure as [`Error::TokenInvalid`]
    /// and out-of-date tokens as [`Error::TokenExpired`], with zero
    /// expiry leeway.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::TokenInvalid,
            })
    }
}
