use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] eyre::Report),
}

impl BotError {
    /// The text to show the user who triggered the error, if the error is an
    /// expected outcome rather than a fault.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            BotError::NotFound(msg)
            | BotError::Validation(msg)
            | BotError::Permission(msg)
            | BotError::Conflict(msg) => Some(msg),
            _ => None,
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
