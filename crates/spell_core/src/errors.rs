use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BloomError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Internal: {0}")]
    Internal(String),

    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    #[error("Rebuild failed: {0}")]
    RebuildFailed(String),
}

pub type Result<T> = std::result::Result<T, BloomError>;
