use thiserror::Error;

/// Error type for index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error("pipeline failed: {0}")]
    Pipeline(String),

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("write queue is closed")]
    QueueClosed,
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
