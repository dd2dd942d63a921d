//! Mock token verifier for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, UserId};
use crate::ports::TokenVerifier;

/// Verifier backed by an explicit token table.
///
/// Unknown tokens are rejected with `AuthError::InvalidToken`, so the
/// default instance rejects everything.
pub struct MockTokenVerifier {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl MockTokenVerifier {
    /// Creates a verifier that accepts nothing.
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a token as valid for the given user.
    pub fn allow(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens
            .write()
            .expect("MockTokenVerifier: lock poisoned")
            .insert(token.into(), user_id);
    }
}

impl Default for MockTokenVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.tokens
            .read()
            .expect("MockTokenVerifier: lock poisoned")
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
