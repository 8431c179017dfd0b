//! Plain text codec.

use crate::codec::Codec;
use crate::common::Result;
use crate::document::Document;

/// Maps a document to its plain-text projection and back.
///
/// Decoding sniffs a UTF-8 or UTF-16 byte order mark, replaces malformed
/// sequences, and produces one paragraph whose line breaks become
/// [`Inline::LineBreak`](crate::document::Inline::LineBreak)s. Encoding
/// writes UTF-8 without a BOM.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextCodec;

impl PlainTextCodec {
    pub fn decode_str(text: &str) -> Document {
        Document::from_text(text)
    }
}

impl Codec for PlainTextCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let (text, _, _) = encoding_rs::UTF_8.decode(bytes);
        Ok(Self::decode_str(&text))
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        Ok(document.plain_text().into_bytes())
    }
}
