use serde::{Deserialize, Serialize};

/// Registration / login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Domain user (business view). The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
}

/// Stored record: user plus PHC-encoded argon2 hash
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub user: User,
    pub password_hash: String,
}
