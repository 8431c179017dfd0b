//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from the
//! XML and ZIP crates' error types to the unified Error type.

#[cfg(feature = "ooxml")]
use super::types::Error;

#[cfg(feature = "ooxml")]
impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(feature = "ooxml")]
impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(feature = "ooxml")]
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::Zip(other.to_string()),
        }
    }
}
