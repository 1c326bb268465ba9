//! Error types for raster and table access

use thiserror::Error;

/// Main error type for data access operations
#[derive(Error, Debug)]
pub enum FitsError {
    /// Operands of unequal dimension, or a raster whose dimension disagrees
    /// with the stored array.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Index outside `[0, shape)` after backward indexing, or tiling beyond 6 axes.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Invalid value detected before any I/O is attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-zero status returned by the storage engine.
    #[error("Engine error {status} while trying to {context}")]
    Engine { status: i32, context: String },

    /// The engine cannot provide a usable configuration (e.g. a zero row chunk).
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FitsError {
    /// Build an engine failure from a status code and the attempted operation.
    pub fn engine(status: i32, context: impl Into<String>) -> Self {
        FitsError::Engine {
            status,
            context: context.into(),
        }
    }

    /// Status code of an engine failure.
    pub fn status(&self) -> Option<i32> {
        match self {
            FitsError::Engine { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Specialized Result type for data access operations
pub type Result<T> = std::result::Result<T, FitsError>;

impl From<bincode::Error> for FitsError {
    fn from(err: bincode::Error) -> Self {
        FitsError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for FitsError {
    fn from(err: serde_json::Error) -> Self {
        FitsError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_message() {
        let err = FitsError::engine(219, "find column 'FLUX'");
        assert_eq!(err.status(), Some(219));
        assert_eq!(
            err.to_string(),
            "Engine error 219 while trying to find column 'FLUX'"
        );
        assert_eq!(FitsError::Validation("x".into()).status(), None);
    }
}
