//! TokenVerifier port - Interface for connection handshake authentication.
//!
//! Each real-time connection presents one opaque bearer token during the
//! handshake. The token is minted by the external sign-in flow (session
//! tokens backed by refresh-token rotation); this core only consumes the
//! verification result.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, UserId};

/// Port for resolving a bearer token to a user identity.
///
/// # Contract
///
/// Implementations must:
/// - Return the user id only for a token that is currently valid
/// - Return `AuthError::TokenExpired` for a well-formed but expired token
/// - Return `AuthError::InvalidToken` for anything malformed or forged
/// - Return `AuthError::ServiceUnavailable` for transient backend failures
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies a bearer token and returns the authenticated user id.
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVerifier(Option<UserId>);

    #[async_trait]
    impl TokenVerifier for FixedVerifier {
        async fn verify(&self, _token: &str) -> Result<UserId, AuthError> {
            self.0.clone().ok_or(AuthError::InvalidToken)
        }
    }

    #[tokio::test]
    async fn verifier_returns_user_for_valid_token() {
        let verifier = FixedVerifier(Some(UserId::new("user-1").unwrap()));
        let user = verifier.verify("any").await.unwrap();
        assert_eq!(user.as_str(), "user-1");
    }

    #[tokio::test]
    async fn verifier_rejects_invalid_token() {
        let verifier = FixedVerifier(None);
        assert!(matches!(
            verifier.verify("any").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_verifier_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn TokenVerifier) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<std::sync::Arc<dyn TokenVerifier>>();
    }
}
