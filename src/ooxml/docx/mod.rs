//! Word document (.docx) codec.
//!
//! # Example
//!
//! ```rust
//! use folio::codec::Codec;
//! use folio::document::Document;
//! use folio::ooxml::docx::DocxCodec;
//!
//! let codec = DocxCodec::default();
//! let bytes = codec.encode(&Document::from_text("Hello"))?;
//! assert_eq!(codec.decode(&bytes)?.plain_text(), "Hello");
//! # Ok::<(), folio::common::Error>(())
//! ```

pub mod package;
pub mod reader;
pub mod writer;

pub use package::{PackageReader, PackageWriter};

use crate::codec::Codec;
use crate::common::Result;
use crate::document::{Block, Document};
use crate::layout::TableLayout;

/// Escape XML special characters, dropping characters XML 1.0 forbids.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {},
            c => out.push(c),
        }
    }
    out
}

/// Structured package codec. Tables are laid out after import and, when
/// their widths are missing, before export.
#[derive(Debug, Clone, Default)]
pub struct DocxCodec {
    layout: TableLayout,
}

impl DocxCodec {
    pub fn new(layout: TableLayout) -> Self {
        Self { layout }
    }
}

impl Codec for DocxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let mut package = PackageReader::new(bytes)?;
        let xml = package.main_document()?;
        let mut document = reader::read_document(&xml)?;
        self.layout.apply_all(&mut document);
        Ok(document)
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        if needs_layout(document) {
            let mut copy = document.clone();
            self.layout.apply_all(&mut copy);
            return writer::write_package(&copy);
        }
        writer::write_package(document)
    }
}

fn needs_layout(document: &Document) -> bool {
    document
        .blocks()
        .filter_map(Block::as_table)
        .any(|t| t.column_widths.len() != t.column_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RGBColor;
    use crate::config::LayoutOptions;
    use crate::document::{
        Alignment, Cell, CharFormat, Inline, List, MarkerStyle, Paragraph, Row, Run, Table, TextStyle,
    };
    use crate::layout::FontSpec;
    use proptest::prelude::*;
    use std::io::{Cursor, Read};

    fn codec() -> DocxCodec {
        // One unit per character keeps widths easy to reason about.
        let measurer = |text: &str, _font: &FontSpec<'_>| text.chars().count() as f32;
        DocxCodec::new(TableLayout::new(LayoutOptions::default(), measurer))
    }

    fn sample() -> Document {
        let format = CharFormat {
            font_family: Some("Courier New".into()),
            font_size: Some(12.0),
            style: TextStyle::BOLD | TextStyle::ITALIC | TextStyle::UNDERLINE,
            color: RGBColor::new(0x11, 0x22, 0x33),
        };
        let heading = Paragraph {
            inlines: vec![
                Inline::Run(Run::with_format("Styled", format)),
                Inline::LineBreak,
                Inline::Run(Run::new("second line")),
            ],
            alignment: Alignment::Right,
            line_spacing: Some(2.0),
        };
        let table = Table::new(vec![
            Row::new(vec![Cell::from_text("a very long header cell").with_span(2)]),
            Row::new(vec![Cell::from_text("x"), Cell::new()]),
        ]);
        let mut list = List::new(MarkerStyle::Ordered);
        list.push(Paragraph::from_text("one"));
        list.push(Paragraph::from_text("two"));
        Document::from_blocks(vec![
            Block::Paragraph(heading),
            Block::Table(table),
            Block::List(list),
        ])
    }

    #[test]
    fn test_round_trip_keeps_structure() {
        let codec = codec();
        let doc = sample();
        let back = codec.decode(&codec.encode(&doc).unwrap()).unwrap();

        assert_eq!(back.plain_text(), doc.plain_text());
        let heading = back.blocks[0].as_paragraph().unwrap();
        assert_eq!(heading.alignment, Alignment::Right);
        assert_eq!(heading.line_spacing, Some(2.0));
        let styled = heading.inlines[0].as_run().unwrap();
        assert_eq!(styled.format, doc.blocks[0].as_paragraph().unwrap().inlines[0].as_run().unwrap().format);
        assert_eq!(heading.inlines[1], Inline::LineBreak);

        let table = back.blocks[1].as_table().unwrap();
        assert_eq!(table.rows[0].cells[0].span(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(back.blocks[2].as_list().unwrap().items.len(), 2);
    }

    #[test]
    fn test_column_widths_are_idempotent() {
        let codec = codec();
        let first = codec.decode(&codec.encode(&sample()).unwrap()).unwrap();
        let second = codec.decode(&codec.encode(&first).unwrap()).unwrap();
        let widths = |d: &Document| d.blocks[1].as_table().unwrap().column_widths.clone();
        assert_eq!(widths(&first), widths(&second));
        assert!(widths(&first).iter().all(|w| *w >= 40.0));
    }

    #[test]
    fn test_package_parts() {
        let bytes = codec().encode(&sample()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/_rels/document.xml.rels",
            "word/numbering.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {name}");
        }

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("<w:tblGrid>"));
        assert!(xml.contains(r#"<w:numId w:val="1"/>"#));
        assert!(xml.contains(r#"<w:sz w:val="18"/>"#));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(codec().decode(b"not a zip").is_err());
    }

    #[test]
    fn test_nested_table_filler_is_dropped() {
        let inner = Table::new(vec![Row::new(vec![Cell::from_text("i")])]);
        let outer = Table::new(vec![Row::new(vec![
            Cell::from_blocks(vec![Block::Table(inner.clone())]),
            Cell::from_text("b"),
            Cell::from_blocks(vec![
                Block::Table(inner),
                Block::Paragraph(Paragraph::from_text("after")),
            ]),
        ])]);
        let doc = Document::from_blocks(vec![Block::Table(outer)]);
        assert_eq!(doc.plain_text(), "i\nb\ni\nafter");

        let codec = codec();
        let back = codec.decode(&codec.encode(&doc).unwrap()).unwrap();
        assert_eq!(back.plain_text(), doc.plain_text());
        let cells = &back.blocks[0].as_table().unwrap().rows[0].cells;
        assert_eq!(cells[0].blocks.len(), 1);
        assert_eq!(cells[2].blocks.len(), 2);
    }

    /// Flat table: random spans, one to three paragraphs per cell.
    fn arb_table() -> impl Strategy<Value = Table> {
        let cell = (prop::collection::vec("[a-z ]{0,6}", 1..4), 1u32..3).prop_map(|(texts, span)| {
            let blocks = texts
                .iter()
                .map(|t| Block::Paragraph(Paragraph::from_text(t)))
                .collect();
            Cell::from_blocks(blocks).with_span(span)
        });
        let row = prop::collection::vec(cell, 1..4).prop_map(Row::new);
        prop::collection::vec(row, 1..4).prop_map(Table::new)
    }

    fn arb_paragraph() -> impl Strategy<Value = Paragraph> {
        let run = ("[a-zA-Z0-9 &<>\u{e9}]{0,10}", 0u8..8).prop_map(|(text, bits)| {
            Run::new(text).with_style(TextStyle::from_bits_truncate(bits))
        });
        let alignment = prop_oneof![
            Just(Alignment::Left),
            Just(Alignment::Center),
            Just(Alignment::Right),
            Just(Alignment::Justify),
        ];
        let spacing = prop_oneof![Just(None), Just(Some(1.0f32)), Just(Some(1.5f32)), Just(Some(2.0f32))];
        (prop::collection::vec((run, any::<bool>()), 1..4), alignment, spacing).prop_map(
            |(runs, alignment, line_spacing)| {
                let mut inlines = Vec::new();
                for (run, line_break) in runs {
                    inlines.push(Inline::Run(run));
                    if line_break {
                        inlines.push(Inline::LineBreak);
                    }
                }
                Paragraph {
                    inlines,
                    alignment,
                    line_spacing,
                }
            },
        )
    }

    proptest! {
        #[test]
        fn prop_projection_survives_round_trip(paragraphs in prop::collection::vec(arb_paragraph(), 1..5)) {
            let doc = Document::from_blocks(paragraphs.into_iter().map(Block::Paragraph).collect());
            let codec = codec();
            let back = codec.decode(&codec.encode(&doc).unwrap()).unwrap();
            prop_assert_eq!(back.plain_text(), doc.plain_text());
        }

        #[test]
        fn prop_tables_round_trip(
            blocks in prop::collection::vec(
                prop_oneof![
                    arb_table().prop_map(Block::Table),
                    arb_paragraph().prop_map(Block::Paragraph),
                ],
                1..4,
            ),
        ) {
            let doc = Document::from_blocks(blocks);
            let codec = codec();
            let back = codec.decode(&codec.encode(&doc).unwrap()).unwrap();
            prop_assert_eq!(back.plain_text(), doc.plain_text());
        }
    }
}
