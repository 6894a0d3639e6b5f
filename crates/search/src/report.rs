//! Result log and run reports.

use crate::scheduler::Evaluated;
use flagforge_autotune::CacheStats;
use flagforge_model::{FlagSet, Outcome};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// One evaluation observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Strategy step that requested the evaluation (1-based).
    pub step: usize,
    pub set: FlagSet,
    pub flags: Vec<String>,
    pub outcome: Outcome,
    #[serde(default)]
    pub cached: bool,
}

impl LogEntry {
    pub fn new(step: usize, evaluated: &Evaluated) -> Self {
        Self {
            step,
            set: evaluated.set.clone(),
            flags: evaluated.flags.clone(),
            outcome: evaluated.outcome.clone(),
            cached: evaluated.cached,
        }
    }

    pub fn cost(&self) -> f64 {
        self.outcome.cost()
    }

    fn restore_outcome_flags(&mut self) {
        self.outcome.set_flags(&self.flags);
    }
}

/// Append-only record of every evaluation, in the order strategies asked
/// for them.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    entries: Vec<LogEntry>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries ordered fastest first; failures last. Stable, so equal costs
    /// keep their recording order.
    pub fn finalize(self) -> Vec<LogEntry> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| a.outcome.cmp_cost(&b.outcome));
        entries
    }
}

/// Complete report for one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Strategy name (`hill-climb`, `tabu` or `sweep`).
    pub strategy: String,

    /// Evaluator name.
    pub evaluator: String,

    /// Configured step budget.
    pub iterations: usize,

    /// Steps that ran to completion.
    pub steps_completed: usize,

    /// False when the run stopped before its budget.
    pub complete: bool,

    /// Why the run stopped early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Evaluation of the starting state.
    pub baseline: LogEntry,

    /// Best state observed, including the starting state.
    pub best: LogEntry,

    /// Best cost after each step; `None` while nothing has succeeded.
    pub trajectory: Vec<Option<f64>>,

    pub cache: CacheStats,

    pub generated_at_unix_ms: u64,

    /// Every logged evaluation, fastest first.
    pub results: Vec<LogEntry>,
}

impl RunReport {
    /// Best-first successful entries.
    pub fn successes(&self) -> impl Iterator<Item = &LogEntry> {
        self.results.iter().filter(|e| e.outcome.is_success())
    }

    /// Speedup of the best state over the starting state, if both built and
    /// ran.
    pub fn speedup(&self) -> Option<f64> {
        match (self.baseline.outcome.cost(), self.best.outcome.cost()) {
            (base, best) if base.is_finite() && best.is_finite() && best > 0.0 => {
                Some(base / best)
            }
            _ => None,
        }
    }

    /// True if `results` is ordered by nondecreasing cost.
    pub fn is_sorted(&self) -> bool {
        self.results
            .windows(2)
            .all(|w| w[0].outcome.cmp_cost(&w[1].outcome) != Ordering::Greater)
    }

    /// Save report to JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load report from JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut report: Self = serde_json::from_str(&json)?;
        report.baseline.restore_outcome_flags();
        report.best.restore_outcome_flags();
        for entry in &mut report.results {
            entry.restore_outcome_flags();
        }
        Ok(report)
    }
}
