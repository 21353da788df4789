use std::time::Duration;

use async_trait::async_trait;

use super::domain::Session;
use super::errors::SessionError;

/// Token -> session storage.
///
/// Implementations must hand out copies; callers never hold a reference into
/// the underlying map.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Issue a fresh unguessable token bound to `user_id`.
    async fn create(&self, user_id: i64) -> String;

    /// Resolve a token, refreshing `accessed_at`. Expired entries are evicted
    /// and reported as [`SessionError::InvalidToken`].
    async fn get(&self, token: &str) -> Result<Session, SessionError>;

    /// Remove a token. Unknown tokens are ignored.
    async fn destroy(&self, token: &str);

    /// Drop every session whose effective expiry has passed; returns how many were removed.
    async fn gc(&self, max_idle: Duration) -> usize;

    async fn len(&self) -> usize;
}
