use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side view of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    /// Absolute expiry; `None` means only the idle timeout applies.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Expired as of `now` by its absolute deadline.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if now > exp)
    }

    /// Deadline used by GC: the explicit expiry, else `accessed_at + max_idle`.
    /// A zero `max_idle` disables the idle deadline.
    pub fn effective_expiry(&self, max_idle: chrono::Duration) -> Option<DateTime<Utc>> {
        match self.expires_at {
            Some(exp) => Some(exp),
            None if max_idle > chrono::Duration::zero() => self.accessed_at.checked_add_signed(max_idle),
            None => None,
        }
    }
}
