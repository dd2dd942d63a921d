//! Authentication types for the connection handshake.
//!
//! A real-time connection authenticates once, with a short-lived bearer
//! token minted by the external sign-in flow. These types carry the
//! verification result into the gateway; they have no provider
//! dependencies, so any token scheme can populate them via the
//! `TokenVerifier` port.

use thiserror::Error;

/// Authentication errors that can occur during token verification.
///
/// These errors are domain-centric: they describe what went wrong from
/// the gateway's perspective, not the token library's.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// The verification backend is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Verification did not complete within the handshake deadline.
    #[error("Authentication timed out")]
    Timeout,
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the client should obtain a fresh token.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_) | AuthError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_displays_correctly() {
        assert_eq!(format!("{}", AuthError::InvalidToken), "Invalid or expired token");
    }

    #[test]
    fn service_unavailable_displays_message() {
        let err = AuthError::service_unavailable("connection refused");
        assert_eq!(
            format!("{}", err),
            "Auth service unavailable: connection refused"
        );
    }

    #[test]
    fn requires_reauthentication_for_token_errors() {
        assert!(AuthError::InvalidToken.requires_reauthentication());
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::Timeout.requires_reauthentication());
    }

    #[test]
    fn is_transient_for_service_errors() {
        assert!(AuthError::service_unavailable("timeout").is_transient());
        assert!(AuthError::Timeout.is_transient());
        assert!(!AuthError::InvalidToken.is_transient());
    }
}
