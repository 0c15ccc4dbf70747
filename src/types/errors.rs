use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Timed out after {0:?} waiting for the configuration lock")]
    LockTimeout(Duration),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid assignment '{0}', expected KEY=VALUE")]
    InvalidAssignment(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the caller may retry the same operation, or proceed with
    /// stale data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
