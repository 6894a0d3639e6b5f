//! Results of evaluating a single flag combination.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of building and running the target program with one flag set.
///
/// Build and runtime failures are data, not errors: they are recorded and
/// ranked as the worst possible cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Outcome {
    /// Compilation exited non-zero or produced no artifact.
    BuildFailure,
    /// The artifact exited non-zero, died from a signal or timed out.
    RuntimeError,
    /// The artifact ran cleanly in `elapsed_secs` of wall-clock time (mean
    /// over the timed runs).
    Success {
        elapsed_secs: f64,
        /// Sample standard deviation of the timed runs; set when there were
        /// at least two.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stdev_secs: Option<f64>,
        /// Kept out of the serialized form; report entries store the flag
        /// list next to the outcome.
        #[serde(default, skip_serializing)]
        flags: Vec<String>,
    },
}

impl Outcome {
    pub fn success(elapsed_secs: f64, flags: Vec<String>) -> Self {
        Self::Success {
            elapsed_secs,
            stdev_secs: None,
            flags,
        }
    }

    /// Attach the spread of repeated runs. No-op on failures.
    pub fn with_stdev(mut self, stdev: f64) -> Self {
        if let Outcome::Success { stdev_secs, .. } = &mut self {
            *stdev_secs = Some(stdev);
        }
        self
    }

    pub fn stdev_secs(&self) -> Option<f64> {
        match self {
            Outcome::Success { stdev_secs, .. } => *stdev_secs,
            Outcome::BuildFailure | Outcome::RuntimeError => None,
        }
    }

    /// Refill the flag list of a deserialized success.
    pub fn set_flags(&mut self, selected: &[String]) {
        if let Outcome::Success { flags, .. } = self {
            *flags = selected.to_vec();
        }
    }

    /// Cost to minimize. Failures cost `+inf`.
    pub fn cost(&self) -> f64 {
        match self {
            Outcome::Success { elapsed_secs, .. } => *elapsed_secs,
            Outcome::BuildFailure | Outcome::RuntimeError => f64::INFINITY,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Total order on cost: lower is better, failures compare last.
    pub fn cmp_cost(&self, other: &Outcome) -> Ordering {
        self.cost().total_cmp(&other.cost())
    }

    /// `true` iff `self` is strictly cheaper than `other`.
    pub fn improves_on(&self, other: &Outcome) -> bool {
        self.cmp_cost(other) == Ordering::Less
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::BuildFailure => "Build failure",
            Outcome::RuntimeError => "Runtime error",
            Outcome::Success { .. } => "Run success",
        }
    }
}
