use thiserror::Error;

/// Errors produced by value operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Convenience alias for value results.
pub type ValueResult<T> = Result<T, ValueError>;

/// A plain-message cleanup failure, for resources that have no richer error
/// type of their own.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CleanupFailure {
    pub message: String,
}

impl CleanupFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
