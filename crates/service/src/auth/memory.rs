use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::domain::{User, UserRecord};
use super::errors::AuthError;
use super::password::PasswordHasher;
use super::store::UserStore;
use crate::metrics;
use crate::session::SessionStore;

#[derive(Default)]
struct Users {
    /// Last issued id; ids start at 1 and are never reused.
    last_id: i64,
    by_login: HashMap<String, i64>,
    by_id: HashMap<i64, UserRecord>,
}

/// In-memory user registry delegating sessions to a [`SessionStore`].
#[derive(Clone)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<Users>>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    /// Verified against on unknown logins so they cost the same as a wrong password.
    dummy_hash: Option<Arc<str>>,
}

impl InMemoryUserStore {
    pub fn new(sessions: Arc<dyn SessionStore>, hasher: PasswordHasher) -> Self {
        let dummy_hash = match hasher.hash("dummy-password-for-unknown-logins") {
            Ok(h) => Some(Arc::from(h)),
            Err(e) => {
                warn!(error = %e, "failed to prepare dummy hash");
                None
            }
        };
        Self { inner: Arc::default(), sessions, hasher, dummy_hash }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{InMemoryUserStore, PasswordHasher, UserStore, AuthError};
    /// use service::session::InMemorySessionStore;
    /// let users = InMemoryUserStore::new(Arc::new(InMemorySessionStore::new()), PasswordHasher::new(8, 1, 1).unwrap());
    /// let id = tokio_test::block_on(users.register("alice", "pw1")).unwrap();
    /// assert_eq!(id, 1);
    /// assert_eq!(tokio_test::block_on(users.register("alice", "pw2")), Err(AuthError::Conflict));
    /// ```
    #[instrument(skip(self, password))]
    async fn register(&self, username: &str, password: &str) -> Result<i64, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation("username and password are required".into()));
        }
        if self.inner.read().await.by_login.contains_key(username) {
            debug!("login taken");
            return Err(AuthError::Conflict);
        }

        // Hash outside the lock; the write section below re-checks uniqueness.
        let password_hash = self.hasher.hash_blocking(password).await?;

        let mut users = self.inner.write().await;
        if users.by_login.contains_key(username) {
            return Err(AuthError::Conflict);
        }
        users.last_id += 1;
        let id = users.last_id;
        let user = User { id, login: username.to_owned() };
        users.by_login.insert(user.login.clone(), id);
        users.by_id.insert(id, UserRecord { user, password_hash });
        drop(users);

        metrics::record_registration();
        info!(user_id = id, "user_registered");
        Ok(id)
    }

    /// Authenticate and issue a session token.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{InMemoryUserStore, PasswordHasher, UserStore};
    /// use service::session::InMemorySessionStore;
    /// let users = InMemoryUserStore::new(Arc::new(InMemorySessionStore::new()), PasswordHasher::new(8, 1, 1).unwrap());
    /// let id = tokio_test::block_on(users.register("u", "Passw0rd")).unwrap();
    /// let token = tokio_test::block_on(users.login("u", "Passw0rd")).unwrap();
    /// let me = tokio_test::block_on(users.get_user_by_token(&token)).unwrap();
    /// assert_eq!(me.id, id);
    /// ```
    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let found = {
            let users = self.inner.read().await;
            users
                .by_login
                .get(username)
                .and_then(|id| users.by_id.get(id))
                .map(|rec| (rec.user.id, rec.password_hash.clone()))
        };
        let Some((user_id, password_hash)) = found else {
            if let Some(dummy) = &self.dummy_hash {
                let _ = self.hasher.verify_blocking(password, dummy).await;
            }
            metrics::record_login(false);
            warn!("login for unknown user");
            return Err(AuthError::Unauthorized);
        };

        if !self.hasher.verify_blocking(password, &password_hash).await? {
            metrics::record_login(false);
            warn!(user_id, "password mismatch");
            return Err(AuthError::Unauthorized);
        }

        let token = self.sessions.create(user_id).await;
        metrics::record_login(true);
        info!(user_id, "user_logged_in");
        Ok(token)
    }

    async fn get_user_by_token(&self, token: &str) -> Result<User, AuthError> {
        let session = self.sessions.get(token).await.map_err(|_| AuthError::Unauthorized)?;
        let users = self.inner.read().await;
        users
            .by_id
            .get(&session.user_id)
            .map(|rec| rec.user.clone())
            .ok_or(AuthError::Unauthorized)
    }

    async fn logout(&self, token: &str) {
        self.sessions.destroy(token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;

    fn stores() -> (InMemoryUserStore, Arc<InMemorySessionStore>) {
        let sessions = Arc::new(InMemorySessionStore::new());
        let users = InMemoryUserStore::new(sessions.clone(), PasswordHasher::new(8, 1, 1).unwrap());
        (users, sessions)
    }

    #[tokio::test]
    async fn ids_are_sequential_from_one() {
        let (users, _) = stores();
        assert_eq!(users.register("a", "x").await, Ok(1));
        assert_eq!(users.register("b", "x").await, Ok(2));
        assert_eq!(users.register("c", "x").await, Ok(3));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_first_user() {
        let (users, _) = stores();
        let id = users.register("alice", "pw1").await.unwrap();
        assert_eq!(users.register("alice", "pw2").await, Err(AuthError::Conflict));

        // Original password still works, the rejected one does not.
        let token = users.login("alice", "pw1").await.unwrap();
        assert_eq!(users.get_user_by_token(&token).await.unwrap().id, id);
        assert_eq!(users.login("alice", "pw2").await, Err(AuthError::Unauthorized));

        // A conflict does not burn an id.
        assert_eq!(users.register("bob", "pw").await, Ok(id + 1));
    }

    #[tokio::test]
    async fn empty_fields_fail_validation() {
        let (users, _) = stores();
        assert!(matches!(users.register("", "pw").await, Err(AuthError::Validation(_))));
        assert!(matches!(users.register("   ", "pw").await, Err(AuthError::Validation(_))));
        assert!(matches!(users.register("bob", "").await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn login_rejects_unknown_user_and_bad_password() {
        let (users, sessions) = stores();
        users.register("alice", "pw1").await.unwrap();
        assert_eq!(users.login("mallory", "pw1").await, Err(AuthError::Unauthorized));
        assert_eq!(users.login("alice", "nope").await, Err(AuthError::Unauthorized));
        assert_eq!(sessions.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_login_verifies_against_hash_of_equal_cost() {
        use argon2::password_hash::PasswordHash;

        let (users, _) = stores();
        users.register("alice", "pw1").await.unwrap();
        let stored = users.inner.read().await.by_id[&1].password_hash.clone();
        let dummy = users.dummy_hash.clone().unwrap();

        let stored = PasswordHash::new(&stored).unwrap();
        let dummy = PasswordHash::new(&dummy).unwrap();
        assert_eq!(dummy.algorithm, stored.algorithm);
        assert_eq!(dummy.params, stored.params);

        assert_eq!(users.login("ghost", "pw1").await, Err(AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn login_round_trips_through_session_store() {
        let (users, sessions) = stores();
        let id = users.register("alice", "pw1").await.unwrap();
        let token = users.login("alice", "pw1").await.unwrap();

        assert_eq!(sessions.get(&token).await.unwrap().user_id, id);
        let user = users.get_user_by_token(&token).await.unwrap();
        assert_eq!(user, User { id, login: "alice".into() });
    }

    #[tokio::test]
    async fn unknown_or_revoked_token_is_unauthorized() {
        let (users, _) = stores();
        assert_eq!(users.get_user_by_token("never-issued").await, Err(AuthError::Unauthorized));

        users.register("alice", "pw1").await.unwrap();
        let token = users.login("alice", "pw1").await.unwrap();
        users.logout(&token).await;
        users.logout(&token).await;
        assert_eq!(users.get_user_by_token(&token).await, Err(AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn session_for_missing_user_is_unauthorized() {
        let (users, sessions) = stores();
        let orphan = sessions.create(42).await;
        assert_eq!(users.get_user_by_token(&orphan).await, Err(AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn concurrent_registrations_of_same_login_admit_one() {
        let (users, _) = stores();
        let mut handles = Vec::new();
        for i in 0..16 {
            let users = users.clone();
            handles.push(tokio::spawn(async move { users.register("racer", &format!("pw{i}")).await }));
        }
        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(id) => {
                    assert_eq!(id, 1);
                    ok += 1;
                }
                Err(e) => assert_eq!(e, AuthError::Conflict),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn each_login_issues_a_distinct_token() {
        let (users, sessions) = stores();
        users.register("alice", "pw1").await.unwrap();
        let t1 = users.login("alice", "pw1").await.unwrap();
        let t2 = users.login("alice", "pw1").await.unwrap();
        assert_ne!(t1, t2);
        assert_eq!(sessions.len().await, 2);
    }
}
