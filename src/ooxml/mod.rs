//! Office Open XML (OOXML) support.
//!
//! Only WordprocessingML is implemented, and only the subset the document
//! model carries: paragraphs, runs, lists and tables. See [`docx`].

pub mod constants;
pub mod docx;
