//! Error types for Satchel Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Backend errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Read denied: {0}")]
    ReadDenied(String),

    #[error("Write denied: {0}")]
    WriteDenied(String),

    // Manager lifecycle errors
    #[error("Session was already started")]
    AlreadyStarted,

    #[error("Session was not started")]
    NotStarted,

    #[error("Unable to start session: {0}")]
    StartFailed(String),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
