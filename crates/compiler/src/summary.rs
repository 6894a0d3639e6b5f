//! Human-readable summaries of run reports.

use flagforge_model::Outcome;
use flagforge_search::{LogEntry, RunReport};
use std::fmt::Write;

/// Header plus the `top` best entries of `report`, one per line.
pub fn render(report: &RunReport, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "strategy={}, evaluator={}, steps={}/{}, evaluated={}, complete={}, generated_at={}",
        report.strategy,
        report.evaluator,
        report.steps_completed,
        report.iterations,
        report.results.len(),
        report.complete,
        report.generated_at_unix_ms
    );
    if let Some(error) = &report.error {
        let _ = writeln!(out, "aborted: {error}");
    }
    let _ = writeln!(
        out,
        "cache: hits={} misses={} entries={}/{}",
        report.cache.hits, report.cache.misses, report.cache.entries, report.cache.capacity
    );
    let _ = writeln!(out, "baseline: {}", describe(&report.baseline));
    let _ = writeln!(out, "best (step {}): {}", report.best.step, describe(&report.best));
    if let Some(speedup) = report.speedup() {
        let _ = writeln!(out, "speedup: {speedup:.3}x");
    }

    for (rank, entry) in report.results.iter().take(top).enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. step={} bits={} {}",
            rank + 1,
            entry.step,
            entry.set,
            describe(entry)
        );
    }
    out
}

fn describe(entry: &LogEntry) -> String {
    let cached = if entry.cached { " (cached)" } else { "" };
    match &entry.outcome {
        Outcome::Success {
            elapsed_secs,
            stdev_secs,
            ..
        } => {
            let spread = stdev_secs
                .map(|sd| format!(" stdev={sd:.6}s"))
                .unwrap_or_default();
            format!(
                "{} time={elapsed_secs:.6}s{spread} flags=[{}]{cached}",
                entry.outcome.label(),
                entry.flags.join(" ")
            )
        }
        failure => format!("{}{cached}", failure.label()),
    }
}
