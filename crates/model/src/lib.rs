//! Core data model for FlagForge.
//!
//! A run searches over subsets of a fixed [`FlagUniverse`]. Each subset is a
//! [`FlagSet`] bit vector; evaluating one through an [`Evaluator`] yields an
//! [`Outcome`]. Engine-level failures are reported as [`SearchError`].

pub mod cancel;
pub mod error;
pub mod evaluator;
pub mod flagset;
pub mod outcome;
pub mod universe;

pub use cancel::*;
pub use error::*;
pub use evaluator::*;
pub use flagset::*;
pub use outcome::*;
pub use universe::*;
