//! Strategy trait and the per-run context strategies operate on.

use crate::report::{LogEntry, ResultLog};
use crate::scheduler::{Evaluated, Evaluation, Scheduler};
use flagforge_autotune::CandidateCache;
use flagforge_model::{CancelToken, Evaluator, FlagSet, FlagUniverse, SearchResult};

/// Current and best-known states of one run.
///
/// Hill climbing keeps them equal; tabu search lets them diverge.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub current: Evaluated,
    pub best: Evaluated,
    /// Step at which `best` was first reached (0 = starting state).
    pub best_step: usize,
}

impl SearchState {
    pub fn new(start: Evaluated) -> Self {
        Self {
            current: start.clone(),
            best: start,
            best_step: 0,
        }
    }

    /// Promote `current` to best if strictly cheaper.
    pub fn update_best(&mut self, step: usize) -> bool {
        if self.current.improves_on(&self.best) {
            self.best = self.current.clone();
            self.best_step = step;
            true
        } else {
            false
        }
    }
}

/// Resources owned by one run and threaded through every strategy step.
pub struct SearchContext<'a> {
    universe: &'a FlagUniverse,
    evaluator: &'a dyn Evaluator,
    cancel: &'a CancelToken,
    cache: CandidateCache,
    scheduler: Scheduler,
    log: ResultLog,
    step: usize,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        universe: &'a FlagUniverse,
        evaluator: &'a dyn Evaluator,
        cancel: &'a CancelToken,
        cache: CandidateCache,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            universe,
            evaluator,
            cancel,
            cache,
            scheduler,
            log: ResultLog::new(),
            step: 0,
        }
    }

    pub fn universe(&self) -> &FlagUniverse {
        self.universe
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub(crate) fn begin_step(&mut self, step: usize) {
        self.step = step;
    }

    pub(crate) fn into_log(self) -> (ResultLog, CandidateCache) {
        (self.log, self.cache)
    }

    fn evaluation(&self) -> Evaluation<'_> {
        Evaluation {
            universe: self.universe,
            evaluator: self.evaluator,
            cache: &self.cache,
            cancel: self.cancel,
        }
    }

    /// Evaluate one candidate on the calling thread. Not recorded.
    pub fn evaluate(&self, set: FlagSet) -> SearchResult<Evaluated> {
        self.evaluation().evaluate(set)
    }

    /// Evaluate a batch through the scheduler. Not recorded.
    pub fn evaluate_batch(&self, batch: Vec<FlagSet>) -> SearchResult<Vec<Evaluated>> {
        self.scheduler.run_batch(batch, &self.evaluation())
    }

    /// Append to the result log under the current step.
    pub fn record(&mut self, evaluated: &Evaluated) {
        self.log.record(LogEntry::new(self.step, evaluated));
    }
}

/// A search strategy: decides the next state from the current one.
pub trait SearchStrategy {
    /// Name of this strategy, as written in reports.
    fn name(&self) -> &str;

    /// Called once with the evaluated starting state, before the first step.
    fn begin(&mut self, _state: &SearchState) {}

    /// Perform one step, recording every evaluated candidate in the context.
    fn step(&mut self, ctx: &mut SearchContext<'_>, state: &mut SearchState) -> SearchResult<()>;
}
