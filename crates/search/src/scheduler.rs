//! Execution of evaluation batches, sequentially or on a bounded pool.

use flagforge_autotune::CandidateCache;
use flagforge_model::{
    CancelToken, Evaluator, FlagSet, FlagUniverse, Outcome, SearchError, SearchResult,
};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// One evaluated candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub set: FlagSet,
    /// Flags resolved from `set`, in universe order.
    pub flags: Vec<String>,
    pub outcome: Outcome,
    /// Served from the candidate cache.
    pub cached: bool,
}

impl Evaluated {
    pub fn cost(&self) -> f64 {
        self.outcome.cost()
    }

    pub fn improves_on(&self, other: &Evaluated) -> bool {
        self.outcome.improves_on(&other.outcome)
    }
}

/// Everything a single candidate evaluation needs; shared by pool workers.
pub struct Evaluation<'a> {
    pub universe: &'a FlagUniverse,
    pub evaluator: &'a dyn Evaluator,
    pub cache: &'a CandidateCache,
    pub cancel: &'a CancelToken,
}

impl Evaluation<'_> {
    /// Evaluate `set` through the cache.
    ///
    /// Returns `Interrupted` without dispatching if the run was cancelled.
    pub fn evaluate(&self, set: FlagSet) -> SearchResult<Evaluated> {
        self.cancel.check()?;
        let flags = self.universe.resolve(&set);
        let lookup = self.cache.get_or_compute(&set, || self.invoke(&set, &flags))?;
        Ok(Evaluated {
            set,
            flags,
            outcome: lookup.outcome,
            cached: lookup.cached,
        })
    }

    fn invoke(&self, set: &FlagSet, flags: &[String]) -> SearchResult<Outcome> {
        debug!(bits = %set, flags = flags.len(), "evaluating candidate");
        match panic::catch_unwind(AssertUnwindSafe(|| self.evaluator.evaluate(flags))) {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    bits = %set,
                    evaluator = self.evaluator.name(),
                    "evaluator panicked; recording candidate as runtime error"
                );
                Ok(Outcome::RuntimeError)
            }
        }
    }
}

/// Runs a batch of independent evaluations and waits for all of them.
#[derive(Debug)]
pub enum Scheduler {
    Sequential,
    Pooled {
        pool: rayon::ThreadPool,
        width: usize,
    },
}

impl Scheduler {
    /// Sequential for `width == 1`, otherwise a dedicated pool of `width`
    /// worker threads.
    pub fn new(width: usize) -> SearchResult<Self> {
        match width {
            0 => Err(SearchError::invalid("pool width must be > 0")),
            1 => Ok(Scheduler::Sequential),
            width => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(width)
                    .thread_name(|idx| format!("flagforge-eval-{idx}"))
                    .build()
                    .map_err(|e| SearchError::invalid(format!("cannot build worker pool: {e}")))?;
                Ok(Scheduler::Pooled { pool, width })
            }
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Scheduler::Sequential => 1,
            Scheduler::Pooled { width, .. } => *width,
        }
    }

    /// Evaluate every set in `batch`; results come back in input order once
    /// all of them have completed.
    ///
    /// Candidate build/run failures are outcomes and never abort siblings.
    /// Cancellation stops further dispatch and fails the batch with
    /// `Interrupted`.
    pub fn run_batch(
        &self,
        batch: Vec<FlagSet>,
        evaluation: &Evaluation<'_>,
    ) -> SearchResult<Vec<Evaluated>> {
        match self {
            Scheduler::Sequential => batch
                .into_iter()
                .map(|set| evaluation.evaluate(set))
                .collect(),
            Scheduler::Pooled { pool, .. } => pool.install(|| {
                batch
                    .into_par_iter()
                    .map(|set| evaluation.evaluate(set))
                    .collect()
            }),
        }
    }
}
