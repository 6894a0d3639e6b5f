//! Run driver: validates a configuration, evaluates the starting state and
//! steps the chosen strategy through its budget.

use crate::config::{SearchConfig, StrategyKind};
use crate::hill_climb::HillClimb;
use crate::report::{LogEntry, RunReport};
use crate::scheduler::Scheduler;
use crate::strategy::{SearchContext, SearchState, SearchStrategy};
use crate::sweep::FlagSweep;
use crate::tabu::TabuSearch;
use flagforge_autotune::CandidateCache;
use flagforge_model::{CancelToken, Evaluator, FlagUniverse, SearchError, SearchResult};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

/// A run that stopped before its budget.
///
/// `partial` holds what was observed up to the failing step when there is
/// something worth keeping (`NoAvailableMove`, `EvaluatorUnavailable` after
/// the starting state was scored).
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunAborted {
    pub error: SearchError,
    pub partial: Option<Box<RunReport>>,
}

impl RunAborted {
    fn bare(error: SearchError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

impl From<SearchError> for RunAborted {
    fn from(error: SearchError) -> Self {
        Self::bare(error)
    }
}

fn build_strategy(config: &SearchConfig) -> SearchResult<Box<dyn SearchStrategy>> {
    Ok(match config.strategy {
        StrategyKind::HillClimb { num_change } => {
            Box::new(HillClimb::new(num_change, config.seed)?)
        }
        StrategyKind::Tabu => Box::new(TabuSearch::new(config.tabu_capacity)),
        StrategyKind::Sweep => Box::new(FlagSweep::new()),
    })
}

/// Run one search to completion.
///
/// Candidate build/run failures never stop a run. Invalid parameters are
/// rejected before anything is evaluated.
pub fn run(
    config: &SearchConfig,
    universe: &FlagUniverse,
    evaluator: &dyn Evaluator,
    cancel: &CancelToken,
) -> Result<RunReport, RunAborted> {
    config.validate(universe.len())?;
    let mut strategy = build_strategy(config)?;
    let cache = CandidateCache::new(config.cache_capacity)?;
    let scheduler = Scheduler::new(config.pool_width)?;

    info!(
        strategy = strategy.name(),
        evaluator = evaluator.name(),
        flags = universe.len(),
        iterations = config.iterations,
        workers = scheduler.width(),
        "starting search"
    );

    let mut ctx = SearchContext::new(universe, evaluator, cancel, cache, scheduler);
    let initial = config
        .initial
        .clone()
        .unwrap_or_else(|| universe.empty_set());
    let baseline = ctx.evaluate(initial)?;
    info!(
        bits = %baseline.set,
        outcome = baseline.outcome.label(),
        cost = baseline.cost(),
        "evaluated starting state"
    );

    let mut state = SearchState::new(baseline.clone());
    strategy.begin(&state);

    let mut trajectory = Vec::with_capacity(config.iterations);
    let mut failure = None;
    for step in 1..=config.iterations {
        ctx.begin_step(step);
        if let Err(error) = strategy.step(&mut ctx, &mut state) {
            failure = Some(error);
            break;
        }
        trajectory.push(finite(state.best.cost()));
        info!(
            step,
            current = state.current.cost(),
            best = state.best.cost(),
            evaluated = ctx.log().len(),
            "step complete"
        );
    }

    let steps_completed = trajectory.len();
    let strategy_name = strategy.name().to_string();
    let (log, cache) = ctx.into_log();
    let report = RunReport {
        strategy: strategy_name,
        evaluator: evaluator.name().to_string(),
        iterations: config.iterations,
        steps_completed,
        complete: failure.is_none(),
        error: failure.as_ref().map(ToString::to_string),
        baseline: LogEntry::new(0, &baseline),
        best: LogEntry::new(state.best_step, &state.best),
        trajectory,
        cache: cache.stats(),
        generated_at_unix_ms: unix_ms(),
        results: log.finalize(),
    };

    match failure {
        None => {
            info!(
                best = %report.best.set,
                cost = report.best.cost(),
                evaluated = report.results.len(),
                "search complete"
            );
            Ok(report)
        }
        Some(error @ SearchError::Interrupted) | Some(error @ SearchError::InvalidParameter(_)) => {
            warn!(%error, steps_completed, "search aborted");
            Err(RunAborted::bare(error))
        }
        Some(error) => {
            warn!(%error, steps_completed, "search aborted; keeping partial report");
            Err(RunAborted {
                error,
                partial: Some(Box::new(report)),
            })
        }
    }
}

fn finite(cost: f64) -> Option<f64> {
    cost.is_finite().then_some(cost)
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
