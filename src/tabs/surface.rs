//! Boundary to the live editing widget.

use crate::document::Document;

/// The live editable surface a shell binds to the active tab.
///
/// The manager reads it before any switch, close or dirty check and writes
/// the incoming tab's snapshot into it on activation.
pub trait EditSurface {
    /// Current content as a document.
    fn read_document(&self) -> Document;

    /// Replace the current content.
    fn write_document(&mut self, document: Document);
}

/// In-memory surface, for headless use and tests.
#[derive(Debug, Clone, Default)]
pub struct BufferSurface {
    document: Document,
}

impl BufferSurface {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Replace the content with plain text.
    pub fn set_text(&mut self, text: &str) {
        self.document = Document::from_text(text);
    }
}

impl EditSurface for BufferSurface {
    fn read_document(&self) -> Document {
        self.document.clone()
    }

    fn write_document(&mut self, document: Document) {
        self.document = document;
    }
}
