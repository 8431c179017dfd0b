//! Unified error types for the editor core.
//!
//! Every codec and the tab lifecycle report through one [`Error`] enum so a
//! shell can decide between retrying and abandoning an operation without
//! knowing which format produced the failure.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
