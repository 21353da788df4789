use async_trait::async_trait;

use super::domain::User;
use super::errors::AuthError;

/// User registry plus login / token resolution.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user; [`AuthError::Conflict`] if the login is taken.
    async fn register(&self, username: &str, password: &str) -> Result<i64, AuthError>;

    /// Verify credentials and open a session, returning its token.
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError>;

    /// Resolve a bearer token to its user. Every failure is [`AuthError::Unauthorized`].
    async fn get_user_by_token(&self, token: &str) -> Result<User, AuthError>;

    /// Close the session behind `token`; unknown tokens are ignored.
    async fn logout(&self, token: &str);
}
