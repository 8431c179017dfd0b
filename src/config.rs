//! Configuration types for layout and the tab lifecycle.
//!
//! Option structs follow one pattern: `Default` carries the editor's stock
//! values, `new()` returns them, and `with_*` builders override single
//! fields. All of them (de)serialize with serde so a shell can persist them.

use serde::{Deserialize, Serialize};

/// Options for the table layout engine.
///
/// # Examples
///
/// ```rust
/// use folio::config::LayoutOptions;
///
/// let options = LayoutOptions::new()
///     .with_default_font("Calibri", 16.0)
///     .with_min_column_width(48.0);
/// assert_eq!(options.cell_padding, 8.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Font family used for runs that do not name one
    pub default_font_family: String,
    /// Font size (device-independent pixels) for runs that do not set one
    pub default_font_size: f32,
    /// Horizontal padding added to every cell's content width
    pub cell_padding: f32,
    /// Floor applied to every resolved column width
    pub min_column_width: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            default_font_family: "Segoe UI".to_string(),
            default_font_size: 14.0,
            cell_padding: 8.0,
            min_column_width: 40.0,
        }
    }
}

impl LayoutOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_default_font(mut self, family: impl Into<String>, size: f32) -> Self {
        self.default_font_family = family.into();
        self.default_font_size = size;
        self
    }

    #[inline]
    pub fn with_cell_padding(mut self, padding: f32) -> Self {
        self.cell_padding = padding;
        self
    }

    #[inline]
    pub fn with_min_column_width(mut self, width: f32) -> Self {
        self.min_column_width = width;
        self
    }
}

/// Options for the tab lifecycle manager.
///
/// # Examples
///
/// ```rust
/// use folio::config::EditorOptions;
///
/// let options = EditorOptions::new().with_untitled_title("Draft");
/// assert_eq!(options.untitled_title, "Draft");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    pub layout: LayoutOptions,
    /// Base title for tabs without a path; later ones get " 2", " 3", ...
    pub untitled_title: String,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            untitled_title: "Untitled".to_string(),
        }
    }
}

impl EditorOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    #[inline]
    pub fn with_untitled_title(mut self, title: impl Into<String>) -> Self {
        self.untitled_title = title.into();
        self
    }
}
