//! Format codecs and the path-based load/save entrypoints.
//!
//! A [`Codec`] maps bytes of one persisted format to a [`Document`] and back.
//! [`Codecs`] picks a codec from a path's extension:
//!
//! | extension | load | save |
//! |-----------|------|------|
//! | `.txt` | plain text | plain text |
//! | `.rtf` | rich text | rich text |
//! | `.docx` | package | package |
//! | `.odt` | rich text if the bytes start with `{\rtf`, else plain text | rich text, falling back to plain text |
//! | other | plain text | rich text |
//!
//! `.odt` is not OpenDocument. Saving writes the rich-text export to a
//! staging file and copies it under the `.odt` name; if that fails the
//! plain-text projection is written instead.

mod format;
mod plain;

use std::fs;
use std::io::Write;
use std::path::Path;

pub use format::FileFormat;
pub use plain::PlainTextCodec;

use crate::common::{Error, Result};
use crate::document::{Block, Document};
use crate::layout::TableLayout;

/// A paired import/export mapping for one file format.
pub trait Codec {
    /// Decode a complete file into a document.
    fn decode(&self, bytes: &[u8]) -> Result<Document>;

    /// Encode a document into a complete file.
    fn encode(&self, document: &Document) -> Result<Vec<u8>>;
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        (**self).decode(bytes)
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        (**self).encode(document)
    }
}

/// Stand-in for a codec compiled out by a cargo feature.
#[cfg_attr(all(feature = "rtf", feature = "ooxml"), allow(dead_code))]
#[derive(Debug, Clone, Copy)]
struct DisabledCodec(&'static str);

impl Codec for DisabledCodec {
    fn decode(&self, _bytes: &[u8]) -> Result<Document> {
        Err(Error::FeatureDisabled(self.0.to_string()))
    }

    fn encode(&self, _document: &Document) -> Result<Vec<u8>> {
        Err(Error::FeatureDisabled(self.0.to_string()))
    }
}

fn builtin_rich_text() -> Box<dyn Codec> {
    #[cfg(feature = "rtf")]
    {
        Box::new(crate::rtf::RtfCodec::default())
    }
    #[cfg(not(feature = "rtf"))]
    {
        Box::new(DisabledCodec("rtf"))
    }
}

fn builtin_package(layout: &TableLayout) -> Box<dyn Codec> {
    #[cfg(feature = "ooxml")]
    {
        Box::new(crate::ooxml::docx::DocxCodec::new(layout.clone()))
    }
    #[cfg(not(feature = "ooxml"))]
    {
        let _ = layout;
        Box::new(DisabledCodec("ooxml"))
    }
}

/// Codec registry and the `load`/`save` entrypoints.
pub struct Codecs {
    plain: PlainTextCodec,
    rich: Box<dyn Codec>,
    package: Box<dyn Codec>,
    layout: TableLayout,
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new(TableLayout::default())
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codecs")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Codecs {
    /// Built-in codecs; tables are laid out with `layout`.
    pub fn new(layout: TableLayout) -> Self {
        Self {
            plain: PlainTextCodec,
            rich: builtin_rich_text(),
            package: builtin_package(&layout),
            layout,
        }
    }

    /// Replace the rich-text codec used for `.rtf` and `.odt`.
    pub fn with_rich_text(mut self, codec: Box<dyn Codec>) -> Self {
        self.rich = codec;
        self
    }

    #[inline]
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// The codec that handles `format`.
    pub fn codec(&self, format: FileFormat) -> &dyn Codec {
        match format {
            FileFormat::PlainText => &self.plain,
            FileFormat::RichText | FileFormat::OdtShim => self.rich.as_ref(),
            FileFormat::Package => self.package.as_ref(),
        }
    }

    /// Read and decode the file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::LoadFailure`] wrapping the IO or codec error.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        self.load_inner(path)
            .map_err(|err| Error::load_failure(path, err))
    }

    fn load_inner(&self, path: &Path) -> Result<Document> {
        let bytes = fs::read(path)?;
        let format = FileFormat::for_load(path, &bytes);

        let mut document = self.codec(format).decode(&bytes)?;
        if format != FileFormat::PlainText {
            self.layout.apply_all(&mut document);
        }
        document.normalize();
        Ok(document)
    }

    /// Encode `document` by the format `path` names and write it.
    ///
    /// # Errors
    ///
    /// [`Error::SaveFailure`] wrapping the codec or IO error. The `.odt`
    /// shim only fails when the plain-text fallback fails too.
    pub fn save(&self, document: &Document, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.save_inner(document, path)
            .map_err(|err| Error::save_failure(path, err))
    }

    fn save_inner(&self, document: &Document, path: &Path) -> Result<()> {
        let laid_out;
        let document = if has_tables(document) {
            let mut copy = document.clone();
            self.layout.apply_all(&mut copy);
            laid_out = copy;
            &laid_out
        } else {
            document
        };

        match FileFormat::for_save(path) {
            FileFormat::OdtShim => self.save_odt(document, path),
            format => {
                let bytes = self.codec(format).encode(document)?;
                fs::write(path, bytes)?;
                Ok(())
            },
        }
    }

    fn save_odt(&self, document: &Document, path: &Path) -> Result<()> {
        match self.save_odt_staged(document, path) {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!(
                    "rich-text export to {} failed ({err}); writing plain text",
                    path.display()
                );
                let bytes = self.plain.encode(document)?;
                fs::write(path, bytes)?;
                Ok(())
            },
        }
    }

    fn save_odt_staged(&self, document: &Document, path: &Path) -> Result<()> {
        let bytes = self.rich.encode(document)?;
        let mut staged = tempfile::Builder::new()
            .prefix("folio-")
            .suffix(".rtf")
            .tempfile()?;
        staged.write_all(&bytes)?;
        staged.flush()?;
        fs::copy(staged.path(), path)?;
        Ok(())
    }
}

fn has_tables(document: &Document) -> bool {
    document.blocks().any(Block::is_table)
}

#[cfg(test)]
mod tests {
    use super::format::RTF_MAGIC;
    use super::*;
    use crate::document::{Alignment, Cell, Paragraph, Row, Table};
    use std::fs;
    use tempfile::tempdir;

    /// Rich-text codec whose export always fails.
    struct FailingEncoder;

    impl Codec for FailingEncoder {
        fn decode(&self, _bytes: &[u8]) -> Result<Document> {
            Err(Error::InvalidFormat("unreadable".into()))
        }

        fn encode(&self, _document: &Document) -> Result<Vec<u8>> {
            Err(Error::InvalidFormat("unwritable".into()))
        }
    }

    fn sample() -> Document {
        let mut table = Table::new(vec![Row::new(vec![Cell::from_text("x"), Cell::from_text("y")])]);
        table.border_thickness = 1.0;
        Document::from_blocks(vec![
            Block::Paragraph(Paragraph::from_text("Title").with_alignment(Alignment::Center)),
            Block::Table(table),
        ])
    }

    #[test]
    fn test_unknown_extension_loads_as_plain_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# heading\nbody").unwrap();
        let doc = Codecs::default().load(&path).unwrap();
        assert_eq!(doc.plain_text(), "# heading\nbody");
    }

    #[test]
    fn test_missing_file_is_load_failure() {
        let dir = tempdir().unwrap();
        let err = Codecs::default().load(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, Error::LoadFailure { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_plain_text_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let codecs = Codecs::default();
        codecs.save(&sample(), &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Title\nx\ny");
        assert_eq!(codecs.load(&path).unwrap().plain_text(), "Title\nx\ny");
    }

    #[cfg(feature = "rtf")]
    #[test]
    fn test_rich_text_load_lays_out_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.rtf");
        let codecs = Codecs::default();
        codecs.save(&sample(), &path).unwrap();
        assert!(fs::read(&path).unwrap().starts_with(RTF_MAGIC));

        let doc = codecs.load(&path).unwrap();
        assert_eq!(doc.plain_text(), sample().plain_text());
        let table = doc.blocks.iter().find_map(Block::as_table).unwrap();
        assert_eq!(table.column_widths.len(), 2);
        assert!(table.column_widths.iter().all(|w| *w >= 40.0));
    }

    #[cfg(feature = "rtf")]
    #[test]
    fn test_odt_writes_rich_text_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.odt");
        let codecs = Codecs::default();
        codecs.save(&sample(), &path).unwrap();
        assert!(fs::read(&path).unwrap().starts_with(RTF_MAGIC));
        assert_eq!(codecs.load(&path).unwrap().plain_text(), sample().plain_text());
    }

    #[test]
    fn test_odt_falls_back_to_plain_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.odt");
        let codecs = Codecs::default().with_rich_text(Box::new(FailingEncoder));
        codecs.save(&sample(), &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Title\nx\ny");
        // Not rich text, so it loads as plain text.
        assert_eq!(codecs.load(&path).unwrap().plain_text(), "Title\nx\ny");
    }

    #[test]
    fn test_encode_failure_is_save_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.rtf");
        let codecs = Codecs::default().with_rich_text(Box::new(FailingEncoder));
        let err = codecs.save(&sample(), &path).unwrap_err();
        assert!(matches!(err, Error::SaveFailure { .. }));
        assert!(!path.exists());
    }

    #[cfg(feature = "rtf")]
    #[test]
    fn test_unknown_save_extension_writes_rich_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let codecs = Codecs::default();
        codecs.save(&sample(), &path).unwrap();
        assert!(fs::read(&path).unwrap().starts_with(RTF_MAGIC));
        // Read back the way it was written.
        let doc = codecs.load(&path).unwrap();
        assert_eq!(doc.plain_text(), sample().plain_text());
        assert!(doc.blocks.iter().any(Block::is_table));
    }

    #[cfg(not(feature = "ooxml"))]
    #[test]
    fn test_disabled_package_codec() {
        let dir = tempdir().unwrap();
        let err = Codecs::default().save(&sample(), dir.path().join("a.docx")).unwrap_err();
        let Error::SaveFailure { source, .. } = err else {
            panic!("expected a save failure");
        };
        assert!(matches!(*source, Error::FeatureDisabled(_)));
    }
}
