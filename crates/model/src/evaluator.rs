//! Contract for the external build-and-run oracle.

use crate::error::SearchResult;
use crate::outcome::Outcome;

/// Builds and runs the target program with a list of flags.
///
/// Implementations must be safe to call concurrently; each invocation works
/// in its own scratch directory and leaves nothing behind. Candidate failures
/// are returned as `Ok(Outcome::BuildFailure | Outcome::RuntimeError)`; `Err`
/// is reserved for failures that make further evaluation pointless.
pub trait Evaluator: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str {
        "evaluator"
    }

    fn evaluate(&self, flags: &[String]) -> SearchResult<Outcome>;
}

impl<F> Evaluator for F
where
    F: Fn(&[String]) -> SearchResult<Outcome> + Send + Sync,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn evaluate(&self, flags: &[String]) -> SearchResult<Outcome> {
        self(flags)
    }
}
