//! Error enum and result alias.
use std::path::PathBuf;

use thiserror::Error;

use crate::tabs::TabId;

/// Main error type for editor core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed file content
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// XML parsing or writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(String),

    /// Rich text (RTF) error
    #[cfg(feature = "rtf")]
    #[error("RTF error: {0}")]
    Rtf(#[from] crate::rtf::RtfError),

    /// The file extension maps to no known format.
    ///
    /// Loading recovers from this by reading the file as plain text.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A codec failed to decode a file; the document was not touched
    #[error("Failed to load {}: {source}", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A codec failed to encode or write a file; the tab keeps its prior state
    #[error("Failed to save {}: {source}", path.display())]
    SaveFailure {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A bound file could not be read back during a dirty check
    #[error("Resource unavailable: {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// No open tab carries this id
    #[error("No open tab with id {0}")]
    TabNotFound(TabId),

    /// Feature disabled at compile time
    #[error("Feature '{0}' is disabled. Enable it with --features {0}")]
    FeatureDisabled(String),
}

impl Error {
    /// Wrap a codec error as a load failure for `path`.
    pub fn load_failure(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::LoadFailure {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a codec error as a save failure for `path`.
    pub fn save_failure(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::SaveFailure {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Returns true for the two persistence failures a caller may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::LoadFailure { .. } | Error::SaveFailure { .. })
    }

    /// Returns true when the file itself could not be read, as opposed to
    /// being read and failing to decode.
    pub fn is_io(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::LoadFailure { source, .. }
            | Error::SaveFailure { source, .. }
            | Error::ResourceUnavailable { source, .. } => source.is_io(),
            _ => false,
        }
    }
}

/// Result type for editor core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failure_display_names_path() {
        let err = Error::load_failure(
            "notes.docx",
            Error::InvalidFormat("missing word/document.xml".into()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to load notes.docx: Invalid format: missing word/document.xml"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::save_failure("a.rtf", Error::Io(io));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("IO error: denied"));
    }

    #[test]
    fn test_is_io_looks_through_wrappers() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::load_failure("a.txt", Error::Io(missing)).is_io());
        assert!(!Error::load_failure("a.docx", Error::InvalidFormat("not a zip".into())).is_io());
        assert!(!Error::Xml("bad".into()).is_io());
    }

    #[test]
    fn test_unsupported_is_not_recoverable_failure() {
        let err = Error::UnsupportedFormat("xyz".into());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Unsupported format: xyz");
    }
}
