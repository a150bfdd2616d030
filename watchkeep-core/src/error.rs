use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, ControlError>;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("there is no service by that name: {0}")]
    NotFound(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("other action already in progress for {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid control file: {0}")]
    Config(String),
    #[error("{0}")]
    Probe(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("xml error: {0}")]
    Xml(String),
    #[error("other error: {0}")]
    Other(String),
}
