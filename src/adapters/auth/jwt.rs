//! JWT adapter for connection handshake tokens.
//!
//! The external sign-in flow mints short-lived HS256 tokens (refresh
//! tokens and their rotation stay on that side); this adapter only
//! validates signature and expiry against the shared secret and extracts
//! the subject claim.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, UserId};
use crate::ports::TokenVerifier;

/// Claims expected on a connection token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject - the user id.
    sub: String,

    /// Expiry, Unix epoch seconds. Required; tokens without it are
    /// rejected.
    exp: i64,

    /// Issued-at, if present.
    #[serde(default)]
    iat: Option<i64>,
}

/// HS256 token verifier over a shared secret.
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    /// Creates a verifier for the given shared secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verifier with zero clock leeway, for tests that mint
    /// already-expired tokens.
    #[cfg(test)]
    fn without_leeway(secret: &str) -> Self {
        let mut verifier = Self::new(secret);
        verifier.validation.leeway = 0;
        verifier
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
                match err.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        UserId::new(data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}
