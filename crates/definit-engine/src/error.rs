//! Error types for the engine.

use definit_value::CleanupError;

/// Failure signalled by a traversal.
#[derive(Debug, thiserror::Error)]
pub enum DeinitError {
    /// A resource's cleanup operation returned an error.
    #[error("cleanup of {resource} failed: {source}")]
    Cleanup {
        /// Label of the resource, from `Deinit::describe`.
        resource: String,
        #[source]
        source: CleanupError,
    },

    /// A composite was nested deeper than the configured limit and was not
    /// entered.
    #[error("structure nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    /// Several failures, in the order they occurred. Only produced under
    /// `ErrorPolicy::CollectAll`.
    #[error("{} cleanup failures", .0.len())]
    Multiple(Vec<DeinitError>),
}

impl DeinitError {
    /// The individual failures, with `Multiple` flattened.
    pub fn failures(&self) -> Vec<&DeinitError> {
        match self {
            DeinitError::Multiple(errors) => errors.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }

    /// Label of the failing resource, for a single cleanup failure.
    pub fn resource(&self) -> Option<&str> {
        match self {
            DeinitError::Cleanup { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

/// Convenience alias for engine results.
pub type DeinitResult<T> = Result<T, DeinitError>;
