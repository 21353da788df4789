use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Ready,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::InProgress => f.write_str("in_progress"),
            TaskStatus::Ready => f.write_str("ready"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only observable through the store once `status` is `Ready`.
    #[serde(skip_serializing, default)]
    pub result: String,
}

impl Task {
    pub(crate) fn new(id: String, now: DateTime<Utc>) -> Self {
        Self { id, status: TaskStatus::InProgress, created_at: now, updated_at: now, result: String::new() }
    }

    /// Advance `updated_at`, keeping it strictly increasing even when the
    /// wall clock has not moved (or stepped back) since the last write.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), r#""in_progress""#);
        assert_eq!(serde_json::to_string(&TaskStatus::Ready).unwrap(), r#""ready""#);
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn touch_is_strictly_monotonic() {
        let now = Utc::now();
        let mut t = Task::new("x".into(), now);
        t.touch(now);
        let first = t.updated_at;
        assert!(first > now);
        t.touch(now - chrono::Duration::seconds(10));
        assert!(t.updated_at > first);
    }
}
