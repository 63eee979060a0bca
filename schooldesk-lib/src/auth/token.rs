//! Session tokens presented to the backend

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::error::AuthError;

/// A bearer token for the signed-in dashboard user.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The JWT sent as `Authorization: Bearer ...`.
    pub access_token: String,
    /// When the token expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token without expiry information.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Creates a token that expires at the given time.
    pub fn with_expiry(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(expires_at),
        }
    }

    /// Returns `true` if the token is known to have expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Supplies the session token for each backend call.
///
/// Session management lives outside this crate; implementors hand over
/// whatever token the surrounding application holds.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Gets the current session token.
    async fn get_token(&self) -> Result<AccessToken, AuthError>;
}

/// A token provider that always returns the same token.
///
/// Suitable for service keys and for tests.
///
/// # Example
///
/// ```
/// use schooldesk_lib::auth::StaticTokenProvider;
///
/// let provider = StaticTokenProvider::new("service-role-key");
/// ```
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Creates a provider for a raw token string.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(access_token),
        }
    }

    /// Creates a provider from an existing token.
    pub fn from_token(token: AccessToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        if self.token.is_expired() {
            return Err(AuthError::SessionExpired {
                message: "static token has expired".to_string(),
            });
        }
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_static_token() {
        let expired = AccessToken::with_expiry("t", Utc::now() - chrono::Duration::seconds(1));
        let provider = StaticTokenProvider::from_token(expired);
        assert!(matches!(
            provider.get_token().await,
            Err(AuthError::SessionExpired { .. })
        ));

        let provider = StaticTokenProvider::new("t");
        assert_eq!(provider.get_token().await.unwrap().access_token, "t");
    }
}
