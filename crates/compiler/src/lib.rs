//! FlagForge compiler facade: runs candidate flag sets through a real
//! compiler and persists search reports.

#[cfg(feature = "cli")]
pub mod cli;
pub mod pipeline;
pub mod session;
pub mod summary;

#[cfg(feature = "cli")]
pub use cli::*;
pub use pipeline::*;
pub use session::*;
pub use summary::render;
