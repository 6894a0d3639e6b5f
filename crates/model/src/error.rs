//! Engine error taxonomy.

use thiserror::Error;

/// Result type alias for engine operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that terminate a search run.
///
/// A candidate that fails to build or run is an [`crate::Outcome`], not one of
/// these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Rejected configuration, raised before any evaluation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Every neighbor of the current state is in the avoidance set.
    #[error("no available move at step {step}: every neighbor is tabu")]
    NoAvailableMove { step: usize },

    /// The evaluator cannot be invoked at all (missing toolchain, unreadable
    /// sources, no scratch space).
    #[error("evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    /// The run was cancelled from outside.
    #[error("search interrupted")]
    Interrupted,
}

impl SearchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::EvaluatorUnavailable(message.into())
    }

    /// Exit status a command-line caller should use for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SearchError::InvalidParameter(_) => 2,
            SearchError::NoAvailableMove { .. } => 3,
            SearchError::EvaluatorUnavailable(_) => 4,
            SearchError::Interrupted => 130,
        }
    }
}
