//! Error types for key-value store operations

/// Errors from store backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("store serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;
