use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid token")]
    InvalidToken,
}

impl SessionError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            SessionError::InvalidToken => 1301,
        }
    }
}
