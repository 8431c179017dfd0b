//! File format selection by extension.

use std::path::Path;

use crate::common::{Error, Result};

/// Leading bytes of every RTF file.
pub(crate) const RTF_MAGIC: &[u8] = b"{\\rtf";

/// Persisted formats the editor reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// `.txt`
    PlainText,
    /// `.rtf`
    RichText,
    /// `.docx`
    Package,
    /// `.odt`: rich-text bytes under an OpenDocument name, not real ODF
    OdtShim,
}

impl FileFormat {
    /// Map a path's extension (case-insensitive) to a format.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for a missing or unknown extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(FileFormat::PlainText),
            "rtf" => Ok(FileFormat::RichText),
            "docx" => Ok(FileFormat::Package),
            "odt" => Ok(FileFormat::OdtShim),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Format to read `path` with, given its content.
    ///
    /// `.odt` and unknown extensions are read as rich text when `content`
    /// starts with `{\rtf`, otherwise as plain text. This mirrors what
    /// [`for_save`](Self::for_save) writes for those paths.
    pub fn for_load(path: &Path, content: &[u8]) -> Self {
        let rich = content.starts_with(RTF_MAGIC);
        match Self::detect(path) {
            Ok(FileFormat::OdtShim) if !rich => FileFormat::PlainText,
            Ok(format) => format,
            Err(err) if rich => {
                log::warn!("{err}; content is rich text");
                FileFormat::RichText
            },
            Err(err) => {
                log::warn!("{err}; reading as plain text");
                FileFormat::PlainText
            },
        }
    }

    /// Format to write `path` with; unknown extensions get rich text.
    pub fn for_save(path: &Path) -> Self {
        Self::detect(path).unwrap_or_else(|err| {
            log::warn!("{err}; writing rich text");
            FileFormat::RichText
        })
    }

    /// Canonical extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::PlainText => "txt",
            FileFormat::RichText => "rtf",
            FileFormat::Package => "docx",
            FileFormat::OdtShim => "odt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(FileFormat::detect(Path::new("a.TXT")).ok(), Some(FileFormat::PlainText));
        assert_eq!(FileFormat::detect(Path::new("dir/b.rtf")).ok(), Some(FileFormat::RichText));
        assert_eq!(FileFormat::detect(Path::new("c.Docx")).ok(), Some(FileFormat::Package));
        assert_eq!(FileFormat::detect(Path::new("d.odt")).ok(), Some(FileFormat::OdtShim));
        assert!(matches!(
            FileFormat::detect(Path::new("e.md")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(FileFormat::detect(Path::new("README")).is_err());
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(FileFormat::for_load(Path::new("notes.md"), b"# notes"), FileFormat::PlainText);
        assert_eq!(
            FileFormat::for_load(Path::new("notes.md"), b"{\\rtf1\\ansi }"),
            FileFormat::RichText
        );
        assert_eq!(FileFormat::for_load(Path::new("a.odt"), b"text"), FileFormat::PlainText);
        assert_eq!(FileFormat::for_load(Path::new("a.odt"), b"{\\rtf1}"), FileFormat::OdtShim);
        assert_eq!(FileFormat::for_load(Path::new("a.txt"), b"{\\rtf1}"), FileFormat::PlainText);
        assert_eq!(FileFormat::for_save(Path::new("notes.md")), FileFormat::RichText);
        assert_eq!(FileFormat::for_save(Path::new("notes.docx")), FileFormat::Package);
    }
}
