//! Search configuration - the knobs a caller turns for one run.

use flagforge_model::{FlagSet, SearchError, SearchResult};
use serde::{Deserialize, Serialize};

/// Which strategy drives the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Monte Carlo bit-flip hill climbing: flip `num_change` random bits per
    /// step, keep the candidate only if it is strictly faster.
    HillClimb { num_change: usize },
    /// Tabu search over the full single-flip neighborhood.
    #[default]
    Tabu,
    /// Every flag evaluated on its own in a single batch.
    Sweep,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::HillClimb { .. } => "hill-climb",
            StrategyKind::Tabu => "tabu",
            StrategyKind::Sweep => "sweep",
        }
    }
}

/// Parameters of one search run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    pub strategy: StrategyKind,

    /// Number of strategy steps (evaluation budget).
    pub iterations: usize,

    /// Concurrent evaluations per batch; 1 evaluates sequentially.
    pub pool_width: usize,

    /// Maximum memoized outcomes.
    pub cache_capacity: usize,

    /// Maximum states in the tabu list.
    pub tabu_capacity: usize,

    /// Seed for the hill-climbing RNG. `None` seeds from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Starting state. `None` starts with every flag excluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<FlagSet>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Tabu,
            iterations: 20,
            pool_width: 1,
            cache_capacity: 10_000,
            tabu_capacity: 1_000,
            seed: None,
            initial: None,
        }
    }
}

impl SearchConfig {
    pub fn hill_climb(num_change: usize) -> Self {
        Self {
            strategy: StrategyKind::HillClimb { num_change },
            ..Default::default()
        }
    }

    pub fn tabu() -> Self {
        Self::default()
    }

    /// A sweep always runs a single step.
    pub fn sweep() -> Self {
        Self {
            strategy: StrategyKind::Sweep,
            iterations: 1,
            ..Default::default()
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_pool_width(mut self, pool_width: usize) -> Self {
        self.pool_width = pool_width;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_tabu_capacity(mut self, capacity: usize) -> Self {
        self.tabu_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_initial(mut self, initial: FlagSet) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Check the configuration against a universe of `universe_len` flags.
    pub fn validate(&self, universe_len: usize) -> SearchResult<()> {
        if universe_len == 0 {
            return Err(SearchError::invalid("flag universe is empty"));
        }
        if self.iterations == 0 {
            return Err(SearchError::invalid("iteration budget must be > 0"));
        }
        if self.pool_width == 0 {
            return Err(SearchError::invalid("pool width must be > 0"));
        }
        if self.cache_capacity == 0 {
            return Err(SearchError::invalid("cache capacity must be > 0"));
        }
        if let StrategyKind::HillClimb { num_change } = self.strategy {
            if num_change == 0 || num_change > universe_len {
                return Err(SearchError::invalid(format!(
                    "num_change must be in 1..={universe_len}, got {num_change}"
                )));
            }
        }
        if self.strategy == StrategyKind::Sweep && self.iterations != 1 {
            return Err(SearchError::invalid(format!(
                "sweep runs exactly one step, got {} iterations",
                self.iterations
            )));
        }
        if let Some(initial) = &self.initial {
            if initial.len() != universe_len {
                return Err(SearchError::invalid(format!(
                    "initial state has {} bits, universe has {universe_len} flags",
                    initial.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SearchConfig::default();
        assert!(config.validate(8).is_ok());
        assert_eq!(config.strategy.name(), "tabu");
    }

    #[test]
    fn test_invalid_configs() {
        assert!(SearchConfig::default().validate(0).is_err());
        assert!(SearchConfig::default().with_iterations(0).validate(4).is_err());
        assert!(SearchConfig::default().with_pool_width(0).validate(4).is_err());
        assert!(SearchConfig::hill_climb(0).validate(4).is_err());
        assert!(SearchConfig::hill_climb(5).validate(4).is_err());
        assert!(SearchConfig::hill_climb(4).validate(4).is_ok());

        let mismatched = SearchConfig::default().with_initial(FlagSet::zeros(3));
        assert!(matches!(
            mismatched.validate(4),
            Err(SearchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_sweep_is_single_step() {
        let config = SearchConfig::sweep();
        assert_eq!(config.strategy.name(), "sweep");
        assert!(config.validate(3).is_ok());
        assert!(matches!(
            config.with_iterations(5).validate(3),
            Err(SearchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = SearchConfig::hill_climb(2).with_seed(7);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""kind":"hill-climb""#));
        let parsed: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
