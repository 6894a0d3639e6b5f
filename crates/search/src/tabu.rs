//! Tabu search over single-flip neighborhoods.

use crate::scheduler::Evaluated;
use crate::strategy::{SearchContext, SearchState, SearchStrategy};
use flagforge_autotune::{neighbors, AvoidanceSet};
use flagforge_model::{FlagSet, SearchError, SearchResult};
use tracing::debug;

/// Evaluates every non-tabu single-flip neighbor of the current state and
/// moves to the cheapest one even if it is worse than the current state.
/// Ties go to the first neighbor in flip-index order. Best is tracked
/// separately and only replaced on strict improvement.
pub struct TabuSearch {
    avoidance: AvoidanceSet,
}

impl TabuSearch {
    pub fn new(tabu_capacity: usize) -> Self {
        Self {
            avoidance: AvoidanceSet::new(tabu_capacity),
        }
    }

    pub fn avoidance(&self) -> &AvoidanceSet {
        &self.avoidance
    }

    fn admissible(&self, current: &FlagSet) -> SearchResult<Vec<FlagSet>> {
        Ok(neighbors(current, 1)?
            .filter(|neighbor| !self.avoidance.contains(neighbor))
            .collect())
    }
}

impl SearchStrategy for TabuSearch {
    fn name(&self) -> &str {
        "tabu"
    }

    fn begin(&mut self, state: &SearchState) {
        self.avoidance.insert(state.current.set.clone());
    }

    fn step(&mut self, ctx: &mut SearchContext<'_>, state: &mut SearchState) -> SearchResult<()> {
        let step = ctx.step();
        let candidates = self.admissible(&state.current.set)?;
        if candidates.is_empty() {
            return Err(SearchError::NoAvailableMove { step });
        }

        let evaluated = ctx.evaluate_batch(candidates)?;
        for candidate in &evaluated {
            ctx.record(candidate);
        }

        let next = evaluated
            .into_iter()
            .reduce(|chosen: Evaluated, next| {
                if next.improves_on(&chosen) {
                    next
                } else {
                    chosen
                }
            })
            .ok_or(SearchError::NoAvailableMove { step })?;

        debug!(
            step,
            bits = %next.set,
            cost = next.cost(),
            "moving to best admissible neighbor"
        );
        state.current = next;
        state.update_best(step);
        self.avoidance.insert(state.current.set.clone());
        Ok(())
    }
}
