use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::domain::Session;
use super::errors::SessionError;
use super::store::SessionStore;

/// Token byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

/// Process-local session store guarded by a single read/write lock.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp every new session with an absolute lifetime of `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { inner: Arc::default(), ttl: Some(ttl) }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl?).ok()?;
        now.checked_add_signed(ttl)
    }

    async fn sweep(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> usize {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, sess| match sess.effective_expiry(max_idle) {
            Some(exp) => now <= exp,
            None => true,
        });
        before - map.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    #[instrument(skip(self))]
    async fn create(&self, user_id: i64) -> String {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            user_id,
            session_id: token.clone(),
            created_at: now,
            accessed_at: now,
            expires_at: self.expiry_from(now),
        };
        let mut map = self.inner.write().await;
        map.insert(token.clone(), session);
        debug!(sessions = map.len(), "session_created");
        token
    }

    async fn get(&self, token: &str) -> Result<Session, SessionError> {
        let now = Utc::now();
        let mut map = self.inner.write().await;
        let sess = map.get_mut(token).ok_or(SessionError::InvalidToken)?;
        if sess.is_expired_at(now) {
            let user_id = sess.user_id;
            map.remove(token);
            debug!(user_id, "session_expired_on_access");
            return Err(SessionError::InvalidToken);
        }
        sess.accessed_at = now;
        Ok(sess.clone())
    }

    async fn destroy(&self, token: &str) {
        let mut map = self.inner.write().await;
        if let Some(sess) = map.remove(token) {
            debug!(user_id = sess.user_id, "session_destroyed");
        }
    }

    #[instrument(skip(self))]
    async fn gc(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            // Idle window too large to represent: nothing can be idle-expired,
            // but absolute expiries still apply.
            return self.sweep(Utc::now(), chrono::Duration::zero()).await;
        };
        self.sweep(Utc::now(), max_idle).await
    }

    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn create_then_get_returns_session() {
        let store = InMemorySessionStore::new();
        let token = store.create(7).await;
        assert_eq!(token.len(), TOKEN_BYTES * 2);

        let sess = store.get(&token).await.unwrap();
        assert_eq!(sess.user_id, 7);
        assert_eq!(sess.session_id, token);
        assert_eq!(sess.expires_at, None);
        assert!(sess.accessed_at >= sess.created_at);
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let store = InMemorySessionStore::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(store.create(1).await));
        }
        assert_eq!(store.len().await, 500);
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("nope").await, Err(SessionError::InvalidToken));
    }

    #[tokio::test]
    async fn get_refreshes_accessed_at() {
        let store = InMemorySessionStore::new();
        let token = store.create(1).await;
        let first = store.get(&token).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.get(&token).await.unwrap();
        assert!(second.accessed_at > first.accessed_at);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = InMemorySessionStore::new();
        let token = store.create(1).await;
        store.destroy(&token).await;
        store.destroy(&token).await;
        assert_eq!(store.get(&token).await, Err(SessionError::InvalidToken));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn expired_session_is_evicted_on_get() {
        let store = InMemorySessionStore::with_ttl(Duration::from_millis(10));
        let token = store.create(3).await;
        assert!(store.get(&token).await.unwrap().expires_at.is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get(&token).await, Err(SessionError::InvalidToken));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn sweep_removes_idle_sessions_only() {
        let store = InMemorySessionStore::new();
        let stale = store.create(1).await;
        let fresh = store.create(2).await;

        // Backdate one session's last access by an hour.
        {
            let mut map = store.inner.write().await;
            let sess = map.get_mut(&stale).unwrap();
            sess.accessed_at = sess.accessed_at - chrono::Duration::hours(1);
        }

        let removed = store.gc(Duration::from_secs(600)).await;
        assert_eq!(removed, 1);
        assert_eq!(store.get(&stale).await, Err(SessionError::InvalidToken));
        assert_eq!(store.get(&fresh).await.unwrap().user_id, 2);
    }

    #[tokio::test]
    async fn access_slides_the_idle_window() {
        let store = InMemorySessionStore::new();
        let token = store.create(5).await;
        {
            let mut map = store.inner.write().await;
            let sess = map.get_mut(&token).unwrap();
            sess.accessed_at = sess.accessed_at - chrono::Duration::hours(1);
        }

        // Reading refreshes accessed_at, so the sweep no longer sees it as idle.
        store.get(&token).await.unwrap();
        assert_eq!(store.gc(Duration::from_secs(600)).await, 0);
        assert_eq!(store.get(&token).await.unwrap().user_id, 5);
    }

    #[tokio::test]
    async fn sweep_honours_explicit_expiry_over_idle_window() {
        let store = InMemorySessionStore::with_ttl(Duration::from_secs(60));
        store.create(1).await;

        // Far in the future the absolute deadline has passed even though the
        // idle window would still keep the session alive.
        let later = Utc::now() + chrono::Duration::minutes(5);
        let removed = store.sweep(later, chrono::Duration::days(1)).await;
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn zero_idle_window_keeps_sessions_without_expiry() {
        let store = InMemorySessionStore::new();
        store.create(1).await;
        let later = Utc::now() + chrono::Duration::days(365);
        assert_eq!(store.sweep(later, chrono::Duration::zero()).await, 0);
        assert_eq!(store.gc(Duration::ZERO).await, 0);
        assert_eq!(store.len().await, 1);
    }
}
