//! RTF (Rich Text Format) codec.
//!
//! # Architecture
//!
//! - **Lexer**: Tokenizes RTF input into control words, symbols, and text
//! - **Parser**: Builds a [`Document`] from tokens
//! - **Writer**: Emits a [`Document`] as RTF that the parser reads back
//!
//! # Example
//!
//! ```rust
//! use folio::codec::Codec;
//! use folio::rtf::RtfCodec;
//!
//! let rtf = br"{\rtf1\ansi{\fonttbl{\f0 Helvetica;}}\f0\pard Hello {\b World}!\par}";
//! let doc = RtfCodec::default().decode(rtf)?;
//! assert_eq!(doc.plain_text(), "Hello World!");
//! # Ok::<(), folio::common::Error>(())
//! ```

pub mod encoding;
mod error;
pub mod lexer;
pub mod parser;
pub mod writer;

pub use error::{RtfError, RtfResult};
pub use lexer::Lexer;
pub use parser::Parser;
pub use writer::{RtfWriter, WriterOptions};

use crate::codec::Codec;
use crate::common::Result;
use crate::document::Document;

/// The built-in rich-text codec.
#[derive(Debug, Clone, Default)]
pub struct RtfCodec {
    options: WriterOptions,
}

impl RtfCodec {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }
}

impl Codec for RtfCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let tokens = Lexer::new(bytes).tokenize()?;
        Ok(Parser::new(&tokens).parse()?)
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        let mut writer = RtfWriter::with_options(Vec::new(), self.options.clone());
        writer.write_document(document)?;
        Ok(writer.into_inner())
    }
}
