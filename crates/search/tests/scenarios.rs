//! End-to-end runs of both strategies against in-memory evaluators.

use approx::assert_relative_eq;
use flagforge_model::{CancelToken, FlagSet, FlagUniverse, Outcome, SearchError, SearchResult};
use flagforge_search::{run, RunReport, SearchConfig};
use std::sync::atomic::{AtomicUsize, Ordering};

fn universe(n: usize) -> FlagUniverse {
    FlagUniverse::new((0..n).map(|i| format!("-f{i}")).collect()).unwrap()
}

/// Recover the bit string for `flags` drawn from `universe(n)`.
fn bits(flags: &[String], n: usize) -> String {
    let mut bits = vec!['0'; n];
    for flag in flags {
        let idx: usize = flag.trim_start_matches("-f").parse().unwrap();
        bits[idx] = '1';
    }
    bits.into_iter().collect()
}

fn success(secs: f64, flags: &[String]) -> SearchResult<Outcome> {
    Ok(Outcome::success(secs, flags.to_vec()))
}

/// Deterministic landscape with a few build failures.
fn rugged(flags: &[String], n: usize) -> SearchResult<Outcome> {
    let key = u64::from_str_radix(&bits(flags, n), 2).unwrap();
    if key % 7 == 3 {
        return Ok(Outcome::BuildFailure);
    }
    success(((key * 37) % 11 + 1) as f64, flags)
}

fn assert_nonincreasing(report: &RunReport) {
    let costs: Vec<f64> = report
        .trajectory
        .iter()
        .map(|c| c.unwrap_or(f64::INFINITY))
        .collect();
    assert!(
        costs.windows(2).all(|w| w[1] <= w[0]),
        "trajectory increased: {costs:?}"
    );
}

#[test]
fn test_hill_climb_finds_only_improvement() {
    let universe = universe(3);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        let bits = bits(flags, 3);
        match bits.as_str() {
            "000" => success(1.0, flags),
            b if b.as_bytes()[1] == b'1' => success(0.5, flags),
            _ => success(2.0, flags),
        }
    };

    for seed in 0..8 {
        let config = SearchConfig::hill_climb(1)
            .with_iterations(5)
            .with_seed(seed);
        let report = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();

        assert!(report.complete);
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.baseline.set.to_string(), "000");
        let tried_bit_one = report.results.iter().any(|e| e.set.get(1));
        if tried_bit_one {
            assert!(report.best.set.get(1));
            assert_relative_eq!(report.best.cost(), 0.5);
        } else {
            assert_eq!(report.best.set.to_string(), "000");
            assert_relative_eq!(report.best.cost(), 1.0);
        }
        assert_nonincreasing(&report);
    }
}

#[test]
fn test_hill_climb_settles_on_bit_one() {
    let universe = universe(3);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        match bits(flags, 3).as_str() {
            "000" => success(1.0, flags),
            b if b.as_bytes()[1] == b'1' => success(0.5, flags),
            _ => success(2.0, flags),
        }
    };
    let config = SearchConfig::hill_climb(1).with_iterations(60).with_seed(11);
    let report = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();

    // From 000 the only strict improvement is 010, and nothing beats it.
    assert_eq!(report.best.set.to_string(), "010");
    assert_eq!(report.results.len(), 60);
}

#[test]
fn test_hill_climb_is_reproducible_with_seed() {
    let universe = universe(8);
    let evaluator = |flags: &[String]| rugged(flags, 8);
    let config = SearchConfig::hill_climb(2).with_iterations(25).with_seed(42);

    let first = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();
    let second = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();
    assert_eq!(first.results, second.results);
    assert_eq!(first.best, second.best);
    assert_nonincreasing(&first);
    assert!(first.is_sorted());
}

#[test]
fn test_tabu_moves_to_cheapest_neighbor() {
    let universe = universe(2);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        match bits(flags, 2).as_str() {
            "00" | "11" => success(1.0, flags),
            "10" => success(0.4, flags),
            _ => Ok(Outcome::BuildFailure),
        }
    };
    let config = SearchConfig::tabu().with_iterations(1);
    let report = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();

    assert_eq!(report.best.set.to_string(), "10");
    assert_eq!(report.best.step, 1);
    assert_relative_eq!(report.best.cost(), 0.4);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[1].outcome, Outcome::BuildFailure);
}

#[test]
fn test_tabu_exhausts_two_flag_space() {
    let universe = universe(2);
    let calls = AtomicUsize::new(0);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        calls.fetch_add(1, Ordering::SeqCst);
        match bits(flags, 2).as_str() {
            "00" | "11" => success(1.0, flags),
            "10" => success(0.4, flags),
            _ => Ok(Outcome::BuildFailure),
        }
    };
    let config = SearchConfig::tabu().with_iterations(10);
    let aborted = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap_err();

    // 00 -> 10 -> 11 -> 01, then both neighbors of 01 are tabu.
    assert_eq!(aborted.error, SearchError::NoAvailableMove { step: 4 });
    let partial = aborted.partial.expect("partial report");
    assert!(!partial.complete);
    assert_eq!(partial.steps_completed, 3);
    assert_eq!(partial.trajectory, vec![Some(0.4), Some(0.4), Some(0.4)]);
    assert_eq!(partial.best.set.to_string(), "10");
    assert_eq!(partial.results.len(), 4);
    assert!(partial.error.is_some());

    // 01 was first evaluated in step 1; the step-3 lookup is a cache hit.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let revisit = partial
        .results
        .iter()
        .find(|e| e.step == 3)
        .expect("step 3 entry");
    assert!(revisit.cached);
    assert_eq!(partial.cache.hits, 1);
}

#[test]
fn test_tabu_single_flag_universe_runs_out_of_moves() {
    let universe = universe(1);
    let evaluator = |flags: &[String]| success(1.0 + flags.len() as f64, flags);
    let config = SearchConfig::tabu().with_iterations(5);
    let aborted = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap_err();

    assert_eq!(aborted.error, SearchError::NoAvailableMove { step: 2 });
    assert_eq!(aborted.error.exit_code(), 3);
    let partial = aborted.partial.unwrap();
    assert_eq!(partial.steps_completed, 1);
    // Tabu moves even when the only neighbor is worse; best stays the start.
    assert_eq!(partial.best.set.to_string(), "0");
}

#[test]
fn test_tabu_log_length_is_sum_of_batches() {
    let universe = universe(6);
    let evaluator = |flags: &[String]| rugged(flags, 6);
    let config = SearchConfig::tabu().with_iterations(3);
    let report = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();

    let per_step = |step: usize| report.results.iter().filter(|e| e.step == step).count();
    assert_eq!(per_step(1), 6);
    assert_eq!(per_step(2), 5);
    assert_eq!(per_step(3), 5);
    assert_eq!(report.results.len(), 16);
    assert_nonincreasing(&report);
    assert!(report.is_sorted());
}

#[test]
fn test_tabu_best_never_regresses() {
    let universe = universe(7);
    let evaluator = |flags: &[String]| rugged(flags, 7);
    let config = SearchConfig::tabu()
        .with_iterations(30)
        .with_tabu_capacity(4)
        .with_initial(FlagSet::from_indices(7, &[0, 3, 5]));
    let report = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();

    assert_nonincreasing(&report);
    assert!(report.best.cost() <= report.baseline.cost());
    let cheapest = report.results[0].cost().min(report.baseline.cost());
    assert_relative_eq!(report.best.cost(), cheapest);
}

#[test]
fn test_pooled_run_matches_sequential() {
    let universe = universe(9);
    let evaluator = |flags: &[String]| rugged(flags, 9);
    let base = SearchConfig::tabu().with_iterations(8);

    let sequential = run(&base, &universe, &evaluator, &CancelToken::new()).unwrap();
    let pooled = run(
        &base.clone().with_pool_width(4),
        &universe,
        &evaluator,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(sequential.results, pooled.results);
    assert_eq!(sequential.best, pooled.best);
    assert_eq!(sequential.trajectory, pooled.trajectory);
}

#[test]
fn test_unavailable_evaluator_keeps_partial_report() {
    let universe = universe(4);
    let calls = AtomicUsize::new(0);
    // Call 0 is the start, 1..=4 are step 1, step 2 reaches call 6.
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        if calls.fetch_add(1, Ordering::SeqCst) == 6 {
            return Err(SearchError::unavailable("compiler vanished"));
        }
        rugged(flags, 4)
    };
    let config = SearchConfig::tabu().with_iterations(20);
    let aborted = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap_err();

    assert!(matches!(aborted.error, SearchError::EvaluatorUnavailable(_)));
    assert_eq!(aborted.error.exit_code(), 4);
    let partial = aborted.partial.unwrap();
    assert!(!partial.complete);
    assert_eq!(partial.steps_completed, 1);
    assert_eq!(partial.results.len(), 4);
    assert_eq!(partial.baseline.set.to_string(), "0000");
}

#[test]
fn test_cancellation_interrupts_run() {
    let universe = universe(5);
    let cancel = CancelToken::new();
    let calls = AtomicUsize::new(0);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        if calls.fetch_add(1, Ordering::SeqCst) == 2 {
            cancel.cancel();
        }
        rugged(flags, 5)
    };
    let config = SearchConfig::tabu().with_iterations(10);
    let aborted = run(&config, &universe, &evaluator, &cancel).unwrap_err();

    assert_eq!(aborted.error, SearchError::Interrupted);
    assert_eq!(aborted.error.exit_code(), 130);
    assert!(aborted.partial.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_invalid_parameters_rejected_before_evaluation() {
    let universe = universe(3);
    let calls = AtomicUsize::new(0);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        calls.fetch_add(1, Ordering::SeqCst);
        success(1.0, flags)
    };

    for config in [
        SearchConfig::tabu().with_iterations(0),
        SearchConfig::tabu().with_pool_width(0),
        SearchConfig::hill_climb(4),
        SearchConfig::tabu().with_initial(FlagSet::zeros(2)),
        SearchConfig::sweep().with_iterations(2),
    ] {
        let aborted = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap_err();
        assert!(matches!(aborted.error, SearchError::InvalidParameter(_)));
        assert!(aborted.partial.is_none());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_sweep_scores_each_flag_alone() {
    let universe = universe(4);
    let evaluator = |flags: &[String]| -> SearchResult<Outcome> {
        match bits(flags, 4).as_str() {
            "0000" => success(1.0, flags),
            "0010" => success(0.25, flags),
            "1000" => Ok(Outcome::BuildFailure),
            _ => success(0.75, flags),
        }
    };
    let config = SearchConfig::sweep().with_pool_width(2);
    let report = run(&config, &universe, &evaluator, &CancelToken::new()).unwrap();

    assert_eq!(report.strategy, "sweep");
    assert_eq!(report.steps_completed, 1);
    assert_eq!(report.results.len(), 4);
    assert!(report.results.iter().all(|e| e.set.count_ones() == 1));
    assert!(report.is_sorted());
    assert_eq!(report.best.set.to_string(), "0010");
    assert_eq!(report.best.step, 1);
    assert_relative_eq!(report.speedup().unwrap(), 4.0);
    assert_eq!(report.results.last().unwrap().outcome, Outcome::BuildFailure);
}

#[test]
fn test_sweep_keeps_baseline_without_strict_improvement() {
    let universe = universe(3);
    let evaluator = |flags: &[String]| success(1.0 + flags.len() as f64, flags);
    let report = run(&SearchConfig::sweep(), &universe, &evaluator, &CancelToken::new()).unwrap();

    assert_eq!(report.best.step, 0);
    assert_eq!(report.best.set.to_string(), "000");
    assert_eq!(report.results.len(), 3);
}
