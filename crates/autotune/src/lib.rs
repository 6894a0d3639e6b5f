//! Search memory for FlagForge: the candidate cache, the avoidance (tabu) set
//! and the bit-flip neighborhood generator.

pub mod avoidance;
pub mod cache;
pub mod neighborhood;

pub use avoidance::*;
pub use cache::*;
pub use neighborhood::*;
