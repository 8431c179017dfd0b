//! Common types shared across the document model, codecs and tab lifecycle.

// Submodule declarations
pub mod color;
pub mod error;
pub mod unit;

// Re-exports for convenience
pub use color::RGBColor;
pub use error::{Error, Result};
