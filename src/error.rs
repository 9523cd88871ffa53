use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbilityError {
    #[error("belief length mismatch: expected {expected}, got {actual}")]
    BeliefLengthMismatch { expected: usize, actual: usize },
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("config validation error: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AbilityError>;
