//! RTF document writer.
//!
//! Emits the subset the parser reads back: font and color tables, character
//! emphasis, alignment, multiple line spacing, line breaks, lists marked with
//! `\lsN` plus `\listtext`, and tables with `\clmgf`/`\clmrg` column spans.
//! Spans are flattened into runs. Tables nested in cells are flattened into
//! the enclosing cell's paragraphs.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use super::parser::UNORDERED_LIST_ID;
use crate::common::{RGBColor, unit};
use crate::document::{Alignment, Block, CharFormat, Document, Inline, MarkerStyle, Paragraph, Table};

/// List override id the writer uses for ordered lists.
const ORDERED_LIST_ID: i32 = 1;

/// RTF writer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// ANSI code page number (default 1252 for Western European)
    pub code_page: u16,
    /// Font written as `\f0`, used by runs that name no family
    pub default_font: String,
    /// Default tab width (in twips)
    pub default_tab_width: i32,
    /// Column width (in twips) for tables that were never laid out
    pub default_column_width: i32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            code_page: 1252,
            default_font: "Segoe UI".to_string(),
            default_tab_width: 720, // 0.5 inch
            default_column_width: 2880,
        }
    }
}

/// A paragraph's position in a list, if any.
type ListMark = Option<(MarkerStyle, usize)>;

/// RTF document writer
pub struct RtfWriter<W: Write> {
    /// Output writer
    writer: W,
    /// Writer options
    options: WriterOptions,
    /// Named font families; `\f{i+1}`
    fonts: Vec<String>,
    /// Non-black colors; `\cf{i+1}`
    colors: Vec<RGBColor>,
}

impl<W: Write> RtfWriter<W> {
    /// Create a new RTF writer
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, WriterOptions::default())
    }

    /// Create a new RTF writer with options
    pub fn with_options(writer: W, options: WriterOptions) -> Self {
        Self {
            writer,
            options,
            fonts: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Consume the writer, returning the underlying output.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write a complete document
    pub fn write_document(&mut self, document: &Document) -> io::Result<()> {
        self.collect_tables(document);

        self.write_document_header()?;
        self.write_font_table()?;
        self.write_color_table()?;
        self.write_control_word("viewkind", Some(4))?;
        self.write_control_word("uc", Some(1))?;
        self.write_str("\n")?;

        for block in &document.blocks {
            self.write_block(block)?;
        }

        self.write_str("}")?;
        self.writer.flush()
    }

    fn collect_tables(&mut self, document: &Document) {
        self.fonts.clear();
        self.colors.clear();
        for paragraph in document.paragraphs() {
            self.collect_inlines(&paragraph.inlines, &CharFormat::default());
        }
    }

    fn collect_inlines(&mut self, inlines: &[Inline], parent: &CharFormat) {
        for inline in inlines {
            match inline {
                Inline::Run(run) => {
                    let format = run.format.inherit(parent);
                    if let Some(family) = format.font_family
                        && !self.fonts.contains(&family)
                    {
                        self.fonts.push(family);
                    }
                    if !format.color.is_black() && !self.colors.contains(&format.color) {
                        self.colors.push(format.color);
                    }
                },
                Inline::Span(span) => {
                    let format = span.format.inherit(parent);
                    self.collect_inlines(&span.inlines, &format);
                },
                Inline::LineBreak => {},
            }
        }
    }

    /// Write document header
    fn write_document_header(&mut self) -> io::Result<()> {
        self.write_str("{")?;
        self.write_control_word("rtf", Some(1))?;
        self.write_control_word("ansi", None)?;
        self.write_control_word("ansicpg", Some(self.options.code_page as i32))?;
        self.write_control_word("deff", Some(0))?;
        self.write_control_word("deftab", Some(self.options.default_tab_width))
    }

    /// Write font table
    fn write_font_table(&mut self) -> io::Result<()> {
        self.write_str("{")?;
        self.write_control_word("fonttbl", None)?;

        let default = self.options.default_font.clone();
        let fonts = self.fonts.clone();
        for (idx, name) in std::iter::once(&default).chain(fonts.iter()).enumerate() {
            self.write_str("{")?;
            self.write_control_word("f", Some(idx as i32))?;
            self.write_control_word("fnil", None)?;
            self.write_control_word("fcharset", Some(0))?;
            self.write_str(" ")?;
            self.write_text(name)?;
            self.write_str(";}")?;
        }

        self.write_str("}")
    }

    /// Write color table; entry 0 is the automatic color.
    fn write_color_table(&mut self) -> io::Result<()> {
        if self.colors.is_empty() {
            return Ok(());
        }

        self.write_str("{")?;
        self.write_control_word("colortbl", None)?;
        self.write_str(";")?;

        let colors = self.colors.clone();
        for color in &colors {
            self.write_control_word("red", Some(color.r as i32))?;
            self.write_control_word("green", Some(color.g as i32))?;
            self.write_control_word("blue", Some(color.b as i32))?;
            self.write_str(";")?;
        }

        self.write_str("}")
    }

    fn write_block(&mut self, block: &Block) -> io::Result<()> {
        match block {
            Block::Paragraph(p) => {
                self.write_paragraph(p, None, false)?;
                self.write_control_word("par", None)?;
                self.write_str("\n")
            },
            Block::List(list) => {
                for (i, p) in list.paragraphs().enumerate() {
                    self.write_paragraph(p, Some((list.marker, i + 1)), false)?;
                    self.write_control_word("par", None)?;
                    self.write_str("\n")?;
                }
                Ok(())
            },
            Block::Table(table) => self.write_table(table),
        }
    }

    /// Write paragraph properties and content, without the terminating
    /// `\par` or `\cell`.
    fn write_paragraph(&mut self, paragraph: &Paragraph, list: ListMark, in_table: bool) -> io::Result<()> {
        self.write_control_word("pard", None)?;
        if in_table {
            self.write_control_word("intbl", None)?;
        }
        if let Some((marker, _)) = list {
            let id = match marker {
                MarkerStyle::Ordered => ORDERED_LIST_ID,
                MarkerStyle::Unordered => UNORDERED_LIST_ID,
            };
            self.write_control_word("ls", Some(id))?;
            self.write_control_word("ilvl", Some(0))?;
        }
        match paragraph.alignment {
            Alignment::Left => {},
            Alignment::Center => self.write_control_word("qc", None)?,
            Alignment::Right => self.write_control_word("qr", None)?,
            Alignment::Justify => self.write_control_word("qj", None)?,
        }
        if let Some(factor) = paragraph.line_spacing {
            self.write_control_word("sl", Some(unit::factor_to_line_units(factor)))?;
            self.write_control_word("slmult", Some(1))?;
        }
        self.write_str(" ")?;

        if let Some((marker, number)) = list {
            self.write_str("{")?;
            self.write_control_word("listtext", None)?;
            self.write_str(" ")?;
            match marker {
                MarkerStyle::Ordered => self.write_text(&format!("{number}."))?,
                MarkerStyle::Unordered => self.write_text("\u{2022}")?,
            }
            self.write_control_word("tab", None)?;
            self.write_str("}")?;
        }

        self.write_inlines(&paragraph.inlines, &CharFormat::default())
    }

    fn write_inlines(&mut self, inlines: &[Inline], parent: &CharFormat) -> io::Result<()> {
        for inline in inlines {
            match inline {
                Inline::Run(run) => {
                    let format = run.format.inherit(parent);
                    if format.is_default() {
                        self.write_text(&run.text)?;
                    } else {
                        self.write_str("{")?;
                        self.write_formatting(&format)?;
                        self.write_str(" ")?;
                        self.write_text(&run.text)?;
                        self.write_str("}")?;
                    }
                },
                Inline::LineBreak => {
                    self.write_control_word("line", None)?;
                    self.write_str(" ")?;
                },
                Inline::Span(span) => {
                    let format = span.format.inherit(parent);
                    self.write_inlines(&span.inlines, &format)?;
                },
            }
        }
        Ok(())
    }

    /// Write character formatting
    fn write_formatting(&mut self, format: &CharFormat) -> io::Result<()> {
        if let Some(family) = &format.font_family
            && let Some(idx) = self.fonts.iter().position(|f| f == family)
        {
            self.write_control_word("f", Some(idx as i32 + 1))?;
        }
        if let Some(size) = format.effective_size() {
            self.write_control_word("fs", Some(unit::px_to_half_points(size)))?;
        }
        if format.bold() {
            self.write_control_word("b", None)?;
        }
        if format.italic() {
            self.write_control_word("i", None)?;
        }
        if format.underline() {
            self.write_control_word("ul", None)?;
        }
        if let Some(idx) = self.colors.iter().position(|c| *c == format.color) {
            self.write_control_word("cf", Some(idx as i32 + 1))?;
        }
        Ok(())
    }

    fn write_table(&mut self, table: &Table) -> io::Result<()> {
        for row in &table.rows {
            self.write_control_word("trowd", None)?;
            self.write_control_word("trgaph", Some(108))?;

            let mut right = 0;
            let mut column = 0;
            for cell in &row.cells {
                for k in 0..cell.span() {
                    if cell.span() > 1 {
                        self.write_control_word(if k == 0 { "clmgf" } else { "clmrg" }, None)?;
                    }
                    if cell.border_thickness > 0.0 {
                        for side in ["clbrdrt", "clbrdrl", "clbrdrb", "clbrdrr"] {
                            self.write_control_word(side, None)?;
                            self.write_control_word("brdrs", None)?;
                            self.write_control_word("brdrw", Some(10))?;
                        }
                    }
                    right += self.column_twips(table, column);
                    column += 1;
                    self.write_control_word("cellx", Some(right))?;
                }
            }
            self.write_str("\n")?;

            for cell in &row.cells {
                let mut paragraphs = Vec::new();
                flatten_paragraphs(&cell.blocks, &mut paragraphs);
                if paragraphs.is_empty() {
                    self.write_empty_cell()?;
                }
                for (i, p) in paragraphs.iter().enumerate() {
                    self.write_paragraph(p, None, true)?;
                    if i + 1 < paragraphs.len() {
                        self.write_control_word("par", None)?;
                    } else {
                        self.write_control_word("cell", None)?;
                    }
                    self.write_str("\n")?;
                }
                for _ in 1..cell.span() {
                    self.write_empty_cell()?;
                }
            }

            self.write_control_word("row", None)?;
            self.write_str("\n")?;
        }
        Ok(())
    }

    fn write_empty_cell(&mut self) -> io::Result<()> {
        self.write_control_word("pard", None)?;
        self.write_control_word("intbl", None)?;
        self.write_control_word("cell", None)?;
        self.write_str("\n")
    }

    fn column_twips(&self, table: &Table, column: usize) -> i32 {
        table
            .column_widths
            .get(column)
            .map_or(self.options.default_column_width, |w| unit::px_to_twips(*w))
    }

    /// Write a control word
    fn write_control_word(&mut self, word: &str, param: Option<i32>) -> io::Result<()> {
        self.write_str("\\")?;
        self.write_str(word)?;
        if let Some(p) = param {
            write!(self.writer, "{}", p)?;
        }
        Ok(())
    }

    /// Write plain text (with proper escaping)
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let mut units = [0u16; 2];
        for ch in text.chars() {
            match ch {
                '\\' => self.write_str("\\\\")?,
                '{' => self.write_str("\\{")?,
                '}' => self.write_str("\\}")?,
                '\t' => self.write_str("\\tab ")?,
                '\n' => self.write_str("\\line ")?,
                '\r' => {},
                c if c.is_ascii_control() => {},
                c if c.is_ascii() => {
                    let mut buf = [0u8; 1];
                    self.write_str(c.encode_utf8(&mut buf))?;
                },
                c => {
                    // Signed 16-bit units, surrogate pairs above the BMP
                    for unit in c.encode_utf16(&mut units).iter() {
                        self.write_control_word("u", Some(*unit as i16 as i32))?;
                        self.write_str("?")?;
                    }
                },
            }
        }
        Ok(())
    }

    /// Write a string
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.writer.write_all(s.as_bytes())
    }
}

/// Collect every paragraph of `blocks` in order, descending into lists and
/// nested tables.
fn flatten_paragraphs<'a>(blocks: &'a [Block], out: &mut Vec<&'a Paragraph>) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => out.push(p),
            Block::List(list) => out.extend(list.paragraphs()),
            Block::Table(table) => {
                for cell in table.cells() {
                    flatten_paragraphs(&cell.blocks, out);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Cell, List, Row, Run, TextStyle};

    fn render(document: &Document) -> String {
        let mut writer = RtfWriter::new(Vec::new());
        writer.write_document(document).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_simple_document() {
        let out = render(&Document::from_text("Hello"));
        assert!(out.starts_with("{\\rtf1\\ansi\\ansicpg1252\\deff0\\deftab720{\\fonttbl{\\f0\\fnil\\fcharset0 Segoe UI;}}"));
        assert!(out.contains("\\pard Hello\\par"));
        assert!(out.ends_with('}'));
        assert!(!out.contains("colortbl"));
    }

    #[test]
    fn test_formatting_and_tables() {
        let mut run = Run::new("Bold").with_style(TextStyle::BOLD | TextStyle::UNDERLINE);
        run.format.font_family = Some("Arial".into());
        run.format.font_size = Some(16.0);
        run.format.color = RGBColor::new(255, 0, 0);
        let para = Paragraph {
            inlines: vec![Inline::Run(run)],
            alignment: Alignment::Justify,
            line_spacing: Some(1.5),
        };
        let out = render(&Document::from_blocks(vec![Block::Paragraph(para)]));
        assert!(out.contains("{\\f1\\fnil\\fcharset0 Arial;}"));
        assert!(out.contains("{\\colortbl;\\red255\\green0\\blue0;}"));
        assert!(out.contains("\\pard\\qj\\sl360\\slmult1 {\\f1\\fs24\\b\\ul\\cf1 Bold}\\par"));
    }

    #[test]
    fn test_escaping() {
        let mut writer = RtfWriter::new(Vec::new());
        writer.write_text("a{b}\\c\td\u{e9}\u{1F600}").unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "a\\{b\\}\\\\c\\tab d\\u233?\\u-10179?\\u-8704?");
    }

    #[test]
    fn test_table_spans_and_widths() {
        let mut table = Table::new(vec![
            Row::new(vec![Cell::from_text("wide").with_span(2)]),
            Row::new(vec![
                Cell::from_text("a").with_border_thickness(0.0),
                Cell::from_blocks(Vec::new()),
            ]),
        ]);
        table.column_widths = vec![100.0, 50.0];
        let out = render(&Document::from_blocks(vec![Block::Table(table)]));
        assert!(out.contains("\\clmgf\\clbrdrt\\brdrs\\brdrw10"));
        assert!(out.contains("\\clmrg\\clbrdrt"));
        assert!(out.contains("\\cellx1500"));
        assert!(out.contains("\\cellx2250"));
        assert!(out.contains("\\pard\\intbl wide\\cell\n\\pard\\intbl\\cell\n\\row"));
        assert!(out.contains("\\trowd\\trgaph108\\cellx1500\\clbrdrt"));
    }

    #[test]
    fn test_list_markers() {
        let mut list = List::new(MarkerStyle::Ordered);
        list.push(Paragraph::from_text("one"));
        list.push(Paragraph::from_text("two"));
        let out = render(&Document::from_blocks(vec![Block::List(list)]));
        assert!(out.contains("\\pard\\ls1\\ilvl0 {\\listtext 1.\\tab}one\\par"));
        assert!(out.contains("{\\listtext 2.\\tab}two"));
    }
}
