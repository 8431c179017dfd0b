//! Folio - document model, format codecs and tab lifecycle for a rich-text
//! editor
//!
//! This library holds everything a multi-format editor needs below the
//! window shell: an in-memory rich-text [`Document`], codecs that move it to
//! and from disk, a table auto-fit [`TableLayout`](layout::TableLayout)
//! engine and a [`TabManager`] that keeps track of open documents.
//!
//! # Features
//!
//! - **Plain text**: `.txt`, BOM aware, lossy on invalid UTF-8
//! - **Rich text**: `.rtf` through a built-in lexer/parser/writer (feature `rtf`)
//! - **Word documents**: `.docx` reader and writer (feature `ooxml`)
//! - **`.odt` shim**: saved through a staging file as rich text
//! - **Table layout**: content-driven column widths with a pluggable measurer
//!
//! # Example - Converting a file
//!
//! ```no_run
//! use folio::Codecs;
//!
//! # fn main() -> folio::Result<()> {
//! let codecs = Codecs::default();
//! let document = codecs.load("notes.rtf")?;
//! println!("{}", document.plain_text());
//! codecs.save(&document, "notes.docx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Managing tabs
//!
//! ```rust
//! use folio::tabs::TabManager;
//!
//! let mut tabs = TabManager::headless();
//! tabs.surface_mut().set_text("draft");
//! let id = tabs.active_id();
//! assert!(tabs.is_dirty(id)?);
//!
//! let second = tabs.create_blank(None);
//! assert_eq!(tabs.tab(second)?.title(), "Untitled 2");
//! # Ok::<(), folio::Error>(())
//! ```

/// Error type, colors and unit conversions
pub mod common;

/// Option structs
pub mod config;

/// The rich-text document model
pub mod document;

/// Text measurement and table column layout
pub mod layout;

/// Format detection, the `Codec` trait and file load/save
pub mod codec;

/// Rich Text Format lexer, parser and writer
#[cfg(feature = "rtf")]
pub mod rtf;

/// Office Open XML word-processing packages
#[cfg(feature = "ooxml")]
pub mod ooxml;

/// Open documents and their lifecycle
pub mod tabs;

// Re-export commonly used types for convenience
pub use codec::{Codec, Codecs, FileFormat};
pub use common::{Error, RGBColor, Result};
pub use config::{EditorOptions, LayoutOptions};
pub use document::{Block, Document, Paragraph, Table};
pub use layout::TableLayout;
pub use tabs::TabManager;
