//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration.
///
/// The secret is shared with the external sign-in service that mints
/// connection tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 shared secret for connection tokens
    pub token_secret: String,
}

impl AuthConfig {
    /// Validate auth configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.token_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_TOKEN_SECRET"));
        }
        // Short secrets are tolerated in development only.
        if *environment == Environment::Production && self.token_secret.len() < 32 {
            return Err(ValidationError::AuthSecretTooShort);
        }
        Ok(())
    }
}
