//! Error types for OxbowDB.

use thiserror::Error;

/// Result type alias using OxbowError.
pub type Result<T> = std::result::Result<T, OxbowError>;

/// Errors that can occur in OxbowDB storage operations.
#[derive(Debug, Error)]
pub enum OxbowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("Page does not exist: {0}")]
    PageNotFound(i32),

    #[error("B+ tree corrupted: {0}")]
    Corrupted(String),
}

impl OxbowError {
    /// Returns true if the operation may succeed after other holders
    /// release their pins.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OxbowError::BufferPoolFull)
    }
}
