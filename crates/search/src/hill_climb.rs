//! Monte Carlo bit-flip hill climbing.

use crate::strategy::{SearchContext, SearchState, SearchStrategy};
use flagforge_model::{SearchError, SearchResult};
use tracing::debug;

/// Flips `num_change` distinct random bits of the current state per step and
/// keeps the candidate only if it is strictly cheaper. One evaluation per
/// step; the current cost never increases.
pub struct HillClimb {
    num_change: usize,
    rng: fastrand::Rng,
}

impl HillClimb {
    pub fn new(num_change: usize, seed: Option<u64>) -> SearchResult<Self> {
        if num_change == 0 {
            return Err(SearchError::invalid("num_change must be > 0"));
        }
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Ok(Self { num_change, rng })
    }
}

impl SearchStrategy for HillClimb {
    fn name(&self) -> &str {
        "hill-climb"
    }

    fn step(&mut self, ctx: &mut SearchContext<'_>, state: &mut SearchState) -> SearchResult<()> {
        let dim = ctx.universe().len();
        if self.num_change > dim {
            return Err(SearchError::invalid(format!(
                "num_change must be in 1..={dim}, got {}",
                self.num_change
            )));
        }

        let positions = self.rng.choose_multiple(0..dim, self.num_change);
        let candidate = ctx.evaluate(state.current.set.flipped(&positions))?;
        ctx.record(&candidate);

        if candidate.improves_on(&state.current) {
            debug!(
                step = ctx.step(),
                bits = %candidate.set,
                cost = candidate.cost(),
                "accepted improving candidate"
            );
            state.current = candidate;
            state.update_best(ctx.step());
        }
        Ok(())
    }
}
