use thiserror::Error;

/// Business errors for auth workflows
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user already exists")]
    Conflict,
    #[error("unauthorized")]
    Unauthorized,
    #[error("hashing error: {0}")]
    HashError(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::Unauthorized => 1004,
            AuthError::HashError(_) => 1101,
        }
    }
}
