//! Combinatorial search over compiler flag sets.
//!
//! Each candidate is a [`FlagSet`](flagforge_model::FlagSet) scored by an
//! [`Evaluator`](flagforge_model::Evaluator); lower wall-clock time wins and
//! build/run failures rank last.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Strategy       │────▶│  Scheduler       │────▶│  Result log     │
//! │  (hill / tabu / │     │  (cache + pool)  │     │  (RunReport)    │
//! │   sweep)        │     │                  │     │                 │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`config::SearchConfig`]: strategy choice, budget and capacities
//! - [`strategy::SearchStrategy`]: one step of a search
//! - [`hill_climb::HillClimb`]: Monte Carlo bit-flip hill climbing
//! - [`tabu::TabuSearch`]: tabu search over single-flip neighborhoods
//! - [`sweep::FlagSweep`]: each flag on its own, in one batch
//! - [`scheduler::Scheduler`]: sequential or pooled batch evaluation
//! - [`report::RunReport`]: ranked results of a run
//! - [`engine::run`]: drives a configured run end to end

pub mod config;
pub mod engine;
pub mod hill_climb;
pub mod report;
pub mod scheduler;
pub mod strategy;
pub mod sweep;
pub mod tabu;

pub use config::{SearchConfig, StrategyKind};
pub use engine::{run, RunAborted};
pub use hill_climb::HillClimb;
pub use report::{LogEntry, ResultLog, RunReport};
pub use scheduler::{Evaluated, Evaluation, Scheduler};
pub use strategy::{SearchContext, SearchState, SearchStrategy};
pub use sweep::FlagSweep;
pub use tabu::TabuSearch;
