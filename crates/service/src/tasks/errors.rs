use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found")]
    NotFound,
    #[error("task not ready")]
    NotReady,
    #[error("generated task id already in use: {0}")]
    DuplicateId(String),
    #[error("task queue closed")]
    QueueClosed,
}

impl TaskError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            TaskError::NotFound => 1401,
            TaskError::NotReady => 1402,
            TaskError::DuplicateId(_) => 1501,
            TaskError::QueueClosed => 1502,
        }
    }
}
