use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskpadError>;

#[derive(Debug, Error)]
pub enum TaskpadError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage capacity exceeded")]
    QuotaExceeded,

    #[error("Invalid import payload: {0}")]
    InvalidImport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TaskpadError {
    /// Checks whether a write failed because the backend ran out of capacity.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }
}
