//! Result and error types for Pagediff.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Pagediff operations
pub type PageDiffResult<T> = Result<T, PageDiffError>;

/// Errors that can occur in Pagediff
#[derive(Debug, Error)]
pub enum PageDiffError {
    /// Reference and candidate images have different sizes
    #[error(
        "Image dimensions differ: reference {}x{}, candidate {}x{}",
        reference.0, reference.1, candidate.0, candidate.1
    )]
    DimensionMismatch {
        /// Reference image size (width, height)
        reference: (u32, u32),
        /// Candidate image size (width, height)
        candidate: (u32, u32),
    },

    /// Input could not be used (unreadable image, failed capture, ...)
    #[error("Invalid input: {message}")]
    InputValidation {
        /// Error message
        message: String,
    },

    /// Numeric fault while computing metrics
    #[error("Computation failed: {message}")]
    Computation {
        /// Error message
        message: String,
    },

    /// Run was cancelled between phases
    #[error("Analysis cancelled before {phase}")]
    Cancelled {
        /// Phase that was about to start
        phase: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Failure category a [`PageDiffError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing input; the run aborts
    InputValidation,
    /// A sub-analysis failed; recorded and the run continues
    SubAnalysisFailure,
    /// Unexpected numeric fault; the run aborts
    Computation,
    /// Cooperative cancellation
    Cancelled,
    /// Invalid configuration
    Configuration,
}

impl PageDiffError {
    /// Create an input validation error
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputValidation {
            message: message.into(),
        }
    }

    /// Create a computation error
    #[must_use]
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DimensionMismatch { .. }
            | Self::InputValidation { .. }
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::InputValidation,
            Self::Computation { .. } => ErrorKind::Computation,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Config { .. } | Self::Yaml(_) => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = PageDiffError::DimensionMismatch {
            reference: (800, 600),
            candidate: (800, 601),
        };
        assert_eq!(
            err.to_string(),
            "Image dimensions differ: reference 800x600, candidate 800x601"
        );
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            PageDiffError::computation("NaN").kind(),
            ErrorKind::Computation
        );
        assert_eq!(PageDiffError::config("bad").kind(), ErrorKind::Configuration);
        let cancelled = PageDiffError::Cancelled {
            phase: "detecting differences".to_string(),
        };
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
        assert!(cancelled.to_string().contains("detecting differences"));
    }

    #[test]
    fn test_io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PageDiffError = io.into();
        assert!(matches!(err, PageDiffError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }
}
