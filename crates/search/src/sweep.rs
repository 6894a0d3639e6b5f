//! One-flag-at-a-time sweep.

use crate::strategy::{SearchContext, SearchState, SearchStrategy};
use flagforge_autotune::neighbors;
use flagforge_model::{SearchError, SearchResult};
use tracing::debug;

/// Evaluates every single-flip neighbor of the starting state in one batch.
/// From the empty state that is each flag on its own. The cheapest candidate
/// becomes current and best only if it strictly beats the starting state.
#[derive(Debug, Default)]
pub struct FlagSweep {
    done: bool,
}

impl FlagSweep {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchStrategy for FlagSweep {
    fn name(&self) -> &str {
        "sweep"
    }

    fn step(&mut self, ctx: &mut SearchContext<'_>, state: &mut SearchState) -> SearchResult<()> {
        let step = ctx.step();
        if self.done {
            return Err(SearchError::invalid("sweep runs exactly one step"));
        }

        let candidates = neighbors(&state.current.set, 1)?.collect();
        let evaluated = ctx.evaluate_batch(candidates)?;
        for candidate in &evaluated {
            ctx.record(candidate);
        }
        self.done = true;

        for candidate in evaluated {
            if candidate.improves_on(&state.current) {
                state.current = candidate;
            }
        }
        if state.update_best(step) {
            debug!(
                step,
                bits = %state.best.set,
                cost = state.best.cost(),
                "single flag beats the starting state"
            );
        }
        Ok(())
    }
}
