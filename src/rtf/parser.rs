//! RTF parser that builds a [`Document`] from tokens.
//!
//! Character and paragraph properties live on a stack of group states.
//! Text bytes are buffered until the character format changes, then decoded
//! with the document code page and emitted as one run. Paragraphs are routed
//! to the current table cell, the running list, or the document body.

use std::collections::HashMap;
use std::mem;

use encoding_rs::Encoding;
use smallvec::SmallVec;

use super::encoding::codepage_to_encoding;
use super::error::{RtfError, RtfResult};
use super::lexer::{ControlWord, Token};
use crate::common::{RGBColor, unit};
use crate::document::{
    Alignment, Block, Cell, CharFormat, Document, Inline, List, MarkerStyle, Paragraph, Row, Run,
    Table, TextStyle,
};

/// Destination groups whose content never reaches the document.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "stylesheet",
    "info",
    "pict",
    "object",
    "fldinst",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "footnote",
    "listtable",
    "listoverridetable",
    "listtext",
    "pntext",
    "pntxta",
    "pntxtb",
    "nesttableprops",
    "nonesttables",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "generator",
    "rsidtbl",
];

/// List override id the writer uses for unordered lists.
pub(crate) const UNORDERED_LIST_ID: i32 = 2;

/// Formatting context of one group.
#[derive(Debug, Clone)]
struct State {
    style: TextStyle,
    font: Option<i32>,
    /// Half-points
    font_size: Option<i32>,
    color: i32,
    alignment: Alignment,
    /// `\sl`, in 240ths of a line when `line_multiple` is set
    line: Option<i32>,
    line_multiple: bool,
    in_table: bool,
    list: Option<i32>,
    /// Fallback characters following `\uN`
    unicode_skip: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            style: TextStyle::empty(),
            font: None,
            font_size: None,
            color: 0,
            alignment: Alignment::Left,
            line: None,
            line_multiple: false,
            in_table: false,
            list: None,
            unicode_skip: 1,
        }
    }
}

impl State {
    fn reset_character(&mut self) {
        self.style = TextStyle::empty();
        self.font = None;
        self.font_size = None;
        self.color = 0;
    }

    fn reset_paragraph(&mut self) {
        self.alignment = Alignment::Left;
        self.line = None;
        self.line_multiple = false;
        self.in_table = false;
        self.list = None;
    }

    fn set_style(&mut self, flag: TextStyle, on: bool) {
        self.style.set(flag, on);
    }
}

/// Cell definition from the `\cellx` run of a row.
#[derive(Debug, Clone, Copy, Default)]
struct CellDef {
    merged: bool,
    bordered: bool,
}

/// RTF Parser.
pub struct Parser<'a> {
    /// Token stream
    tokens: &'a [Token<'a>],
    /// Current position in token stream
    pos: usize,
    /// Current group state
    state: State,
    /// States of enclosing groups
    saved: Vec<State>,
    fonts: HashMap<i32, String>,
    default_font: i32,
    colors: Vec<RGBColor>,
    encoding: &'static Encoding,

    // Text collection
    pending_bytes: Vec<u8>,
    pending_text: String,
    pending_format: CharFormat,
    high_surrogate: Option<u16>,
    fallback_skip: usize,
    inlines: Vec<Inline>,

    // Block assembly
    body: Vec<Block>,
    list: Option<List>,
    table: Option<Table>,
    table_bordered: bool,
    row_defs: SmallVec<[CellDef; 8]>,
    next_def: CellDef,
    in_row: bool,
    cells: Vec<Cell>,
    cell_blocks: Vec<Block>,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            state: State::default(),
            saved: Vec::new(),
            fonts: HashMap::new(),
            default_font: 0,
            colors: Vec::new(),
            encoding: encoding_rs::WINDOWS_1252,
            pending_bytes: Vec::new(),
            pending_text: String::new(),
            pending_format: CharFormat::default(),
            high_surrogate: None,
            fallback_skip: 0,
            inlines: Vec::new(),
            body: Vec::new(),
            list: None,
            table: None,
            table_bordered: false,
            row_defs: SmallVec::new(),
            next_def: CellDef::default(),
            in_row: false,
            cells: Vec::new(),
            cell_blocks: Vec::new(),
        }
    }

    /// Parse the token stream into a document.
    pub fn parse(mut self) -> RtfResult<Document> {
        if !matches!(
            self.tokens,
            [Token::OpenBrace, Token::Control(ControlWord::Rtf(_)), ..]
        ) {
            return Err(RtfError::MissingHeader);
        }

        while let Some(&token) = self.tokens.get(self.pos) {
            self.pos += 1;
            self.handle(token);
        }

        Ok(self.finish())
    }

    fn handle(&mut self, token: Token<'a>) {
        match token {
            Token::OpenBrace => self.open_group(),
            Token::CloseBrace => {
                self.fallback_skip = 0;
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            },
            Token::Text(mut bytes) => {
                if self.fallback_skip > 0 {
                    let n = self.fallback_skip.min(bytes.len());
                    self.fallback_skip -= n;
                    bytes = &bytes[n..];
                }
                if !bytes.is_empty() {
                    self.push_bytes(bytes);
                }
            },
            Token::Hex(byte) => {
                if self.fallback_skip > 0 {
                    self.fallback_skip -= 1;
                } else {
                    self.push_bytes(&[byte]);
                }
            },
            Token::Symbol(ch) => {
                if self.fallback_skip > 0 {
                    self.fallback_skip -= 1;
                } else {
                    self.push_char(ch);
                }
            },
            Token::Binary(_) => {
                self.fallback_skip = self.fallback_skip.saturating_sub(1);
            },
            Token::Control(word) => {
                self.fallback_skip = 0;
                self.apply_control_word(word);
            },
        }
    }

    /// Enter a group, consuming it whole if it is a destination we skip or
    /// a header table we read separately.
    fn open_group(&mut self) {
        self.fallback_skip = 0;
        match self.tokens.get(self.pos) {
            Some(Token::Control(ControlWord::IgnorableDestination)) => self.skip_group(),
            Some(Token::Control(ControlWord::FontTable)) => {
                self.pos += 1;
                self.parse_font_table();
            },
            Some(Token::Control(ControlWord::ColorTable)) => {
                self.pos += 1;
                self.parse_color_table();
            },
            Some(Token::Control(ControlWord::Unknown(name, _)))
                if SKIPPED_DESTINATIONS.contains(name) =>
            {
                self.skip_group()
            },
            _ => self.saved.push(self.state.clone()),
        }
    }

    fn apply_control_word(&mut self, word: ControlWord<'a>) {
        match word {
            ControlWord::AnsiCodePage(cp) => {
                if let Some(encoding) = u32::try_from(cp).ok().and_then(codepage_to_encoding) {
                    self.decode_pending_bytes();
                    self.encoding = encoding;
                }
            },
            ControlWord::DefaultFont(n) => self.default_font = n,

            // Character formatting
            ControlWord::FontNumber(n) => self.state.font = Some(n),
            ControlWord::FontSize(n) => self.state.font_size = (n > 0).then_some(n),
            ControlWord::ColorForeground(n) => self.state.color = n,
            ControlWord::Bold(on) => self.state.set_style(TextStyle::BOLD, on),
            ControlWord::Italic(on) => self.state.set_style(TextStyle::ITALIC, on),
            ControlWord::Underline(on) => self.state.set_style(TextStyle::UNDERLINE, on),
            ControlWord::UnderlineNone => self.state.set_style(TextStyle::UNDERLINE, false),
            ControlWord::Plain => self.state.reset_character(),

            // Paragraph formatting
            ControlWord::Par => self.end_paragraph(),
            ControlWord::Pard => self.state.reset_paragraph(),
            ControlWord::LeftAlign => self.state.alignment = Alignment::Left,
            ControlWord::RightAlign => self.state.alignment = Alignment::Right,
            ControlWord::Center => self.state.alignment = Alignment::Center,
            ControlWord::Justify => self.state.alignment = Alignment::Justify,
            ControlWord::SpaceBetween(n) => self.state.line = (n != 0).then_some(n),
            ControlWord::LineMultiple(on) => self.state.line_multiple = on,
            ControlWord::ListOverride(n) => self.state.list = Some(n),

            // Tables
            ControlWord::TableRowDefaults => {
                self.row_defs.clear();
                self.next_def = CellDef::default();
                self.in_row = true;
            },
            ControlWord::CellMerged => self.next_def.merged = true,
            ControlWord::CellBorder => self.next_def.bordered = true,
            ControlWord::CellX(_) => {
                self.row_defs.push(mem::take(&mut self.next_def));
            },
            ControlWord::InTable => self.state.in_table = true,
            ControlWord::TableCell => self.end_cell(),
            ControlWord::TableRow => self.end_row(),
            // Nested tables are flattened into the enclosing cell.
            ControlWord::NestedCell => {
                if self.has_pending_content() {
                    let paragraph = self.take_paragraph();
                    self.cell_blocks.push(Block::Paragraph(paragraph));
                }
            },

            // Unicode
            ControlWord::Unicode(code) => self.push_unicode(code),
            ControlWord::UnicodeSkip(n) => self.state.unicode_skip = n.max(0) as usize,

            // Special
            ControlWord::Tab => self.push_char('\t'),
            ControlWord::Line => {
                self.flush_text();
                self.inlines.push(Inline::LineBreak);
            },

            _ => {},
        }
    }

    fn push_unicode(&mut self, code: i32) {
        // Parameters are signed 16-bit; negative values wrap.
        let unit = code as u16;
        match unit {
            0xD800..=0xDBFF => self.high_surrogate = Some(unit),
            0xDC00..=0xDFFF => {
                if let Some(high) = self.high_surrogate.take() {
                    let ch = char::decode_utf16([high, unit])
                        .next()
                        .and_then(Result::ok)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    self.push_char(ch);
                }
            },
            _ => self.push_char(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)),
        }
        self.fallback_skip = self.state.unicode_skip;
    }

    // ---------------------------------------------------------------------
    // Text collection
    // ---------------------------------------------------------------------

    fn current_format(&self) -> CharFormat {
        let state = &self.state;
        CharFormat {
            font_family: state
                .font
                .filter(|f| *f != self.default_font)
                .and_then(|f| self.fonts.get(&f).cloned()),
            font_size: state.font_size.map(unit::half_points_to_px),
            style: state.style,
            color: usize::try_from(state.color)
                .ok()
                .filter(|i| *i > 0)
                .and_then(|i| self.colors.get(i).copied())
                .unwrap_or_default(),
        }
    }

    fn sync_format(&mut self) {
        let format = self.current_format();
        if format != self.pending_format {
            self.flush_text();
            self.pending_format = format;
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.sync_format();
        self.pending_bytes.extend_from_slice(bytes);
    }

    fn push_char(&mut self, ch: char) {
        self.sync_format();
        self.decode_pending_bytes();
        self.pending_text.push(ch);
    }

    fn decode_pending_bytes(&mut self) {
        if !self.pending_bytes.is_empty() {
            let (text, _) = self.encoding.decode_without_bom_handling(&self.pending_bytes);
            self.pending_text.push_str(&text);
            self.pending_bytes.clear();
        }
    }

    /// Emit buffered text as a run, merging into the previous run when the
    /// formatting matches.
    fn flush_text(&mut self) {
        self.decode_pending_bytes();
        if self.pending_text.is_empty() {
            return;
        }
        let text = mem::take(&mut self.pending_text);
        if let Some(Inline::Run(last)) = self.inlines.last_mut()
            && last.format == self.pending_format
        {
            last.text.push_str(&text);
            return;
        }
        self.inlines
            .push(Inline::Run(Run::with_format(text, self.pending_format.clone())));
    }

    fn has_pending_content(&self) -> bool {
        !self.inlines.is_empty() || !self.pending_bytes.is_empty() || !self.pending_text.is_empty()
    }

    // ---------------------------------------------------------------------
    // Block assembly
    // ---------------------------------------------------------------------

    fn take_paragraph(&mut self) -> Paragraph {
        self.flush_text();
        let line_spacing = match self.state.line {
            Some(line) if self.state.line_multiple => unit::line_units_to_factor(line),
            _ => None,
        };
        let mut paragraph = Paragraph {
            inlines: mem::take(&mut self.inlines),
            alignment: self.state.alignment,
            line_spacing,
        };
        paragraph.ensure_inline();
        paragraph
    }

    fn end_paragraph(&mut self) {
        let paragraph = self.take_paragraph();

        if self.state.in_table || self.in_row {
            self.cell_blocks.push(Block::Paragraph(paragraph));
            return;
        }

        self.close_table();
        match self.state.list {
            Some(id) => {
                let marker = if id == UNORDERED_LIST_ID {
                    MarkerStyle::Unordered
                } else {
                    MarkerStyle::Ordered
                };
                if self.list.as_ref().is_some_and(|l| l.marker != marker) {
                    self.close_list();
                }
                self.list.get_or_insert_with(|| List::new(marker)).push(paragraph);
            },
            None => {
                self.close_list();
                self.body.push(Block::Paragraph(paragraph));
            },
        }
    }

    fn end_cell(&mut self) {
        // After a `\par` in the cell, `\cell` closes a paragraph even when it is empty.
        if self.has_pending_content() || !self.cell_blocks.is_empty() {
            let paragraph = self.take_paragraph();
            self.cell_blocks.push(Block::Paragraph(paragraph));
        }
        let index = self.cells.len();
        let bordered = self.row_defs.get(index).is_none_or(|d| d.bordered);
        let thickness = if bordered { 1.0 } else { 0.0 };
        self.table_bordered |= bordered;
        let blocks = mem::take(&mut self.cell_blocks);
        self.cells.push(Cell::from_blocks(blocks).with_border_thickness(thickness));
    }

    fn end_row(&mut self) {
        if !self.cell_blocks.is_empty() || self.has_pending_content() {
            self.end_cell();
        }
        self.in_row = false;

        let mut row = Row::default();
        for (i, cell) in mem::take(&mut self.cells).into_iter().enumerate() {
            let merged = self.row_defs.get(i).is_some_and(|d| d.merged);
            if merged && let Some(previous) = row.cells.last_mut() {
                previous.column_span += 1;
                continue;
            }
            row.cells.push(cell);
        }
        if row.cells.is_empty() {
            return;
        }

        self.close_list();
        self.table.get_or_insert_with(Table::default).rows.push(row);
    }

    fn close_table(&mut self) {
        if !self.cells.is_empty() {
            self.end_row();
        }
        if let Some(mut table) = self.table.take() {
            table.border_thickness = if self.table_bordered { 1.0 } else { 0.0 };
            self.table_bordered = false;
            self.body.push(Block::Table(table));
        }
    }

    fn close_list(&mut self) {
        if let Some(list) = self.list.take() {
            self.body.push(Block::List(list));
        }
    }

    fn finish(mut self) -> Document {
        if self.has_pending_content() {
            self.end_paragraph();
        }
        if !self.cell_blocks.is_empty() {
            self.end_row();
        }
        self.close_table();
        self.close_list();

        let mut document = Document::from_blocks(mem::take(&mut self.body));
        if document.blocks.is_empty() {
            document.push(Block::Paragraph(Paragraph::new()));
        }
        document.normalize();
        document
    }

    // ---------------------------------------------------------------------
    // Header tables
    // ---------------------------------------------------------------------

    /// Parse font table entries up to the table's closing brace.
    ///
    /// Handles both `{\f0 Arial;}` entries and the ungrouped `\f0 Arial;` form.
    fn parse_font_table(&mut self) {
        let mut depth = 1usize;
        let mut current: Option<i32> = None;
        let mut name: Vec<u8> = Vec::new();

        while depth > 0
            && let Some(&token) = self.tokens.get(self.pos)
        {
            self.pos += 1;
            match token {
                Token::OpenBrace => {
                    if matches!(
                        self.tokens.get(self.pos),
                        Some(Token::Control(ControlWord::IgnorableDestination))
                    ) {
                        self.skip_group();
                    } else {
                        depth += 1;
                    }
                },
                Token::CloseBrace => {
                    depth -= 1;
                    if let Some(n) = current.take() {
                        self.insert_font(n, &name);
                    }
                    name.clear();
                },
                Token::Control(ControlWord::FontNumber(n)) => {
                    current = Some(n);
                    name.clear();
                },
                Token::Text(bytes) => {
                    for &b in bytes {
                        if b == b';' {
                            if let Some(n) = current.take() {
                                self.insert_font(n, &name);
                            }
                            name.clear();
                        } else {
                            name.push(b);
                        }
                    }
                },
                Token::Hex(b) => name.push(b),
                _ => {},
            }
        }
    }

    fn insert_font(&mut self, number: i32, name: &[u8]) {
        let (decoded, _) = self.encoding.decode_without_bom_handling(name);
        let trimmed = decoded.trim();
        if !trimmed.is_empty() {
            self.fonts.insert(number, trimmed.to_string());
        }
    }

    /// Parse `\redN\greenN\blueN;` entries up to the table's closing brace.
    fn parse_color_table(&mut self) {
        let (mut r, mut g, mut b) = (0u8, 0u8, 0u8);
        let channel = |n: i32| n.clamp(0, 255) as u8;

        while let Some(&token) = self.tokens.get(self.pos) {
            self.pos += 1;
            match token {
                Token::CloseBrace => return,
                Token::OpenBrace => self.skip_group(),
                Token::Control(ControlWord::Red(n)) => r = channel(n),
                Token::Control(ControlWord::Green(n)) => g = channel(n),
                Token::Control(ControlWord::Blue(n)) => b = channel(n),
                Token::Text(bytes) => {
                    for _ in bytes.iter().filter(|b| **b == b';') {
                        self.colors.push(RGBColor::new(r, g, b));
                        (r, g, b) = (0, 0, 0);
                    }
                },
                _ => {},
            }
        }
    }

    /// Skip the rest of a group whose opening brace was already consumed.
    fn skip_group(&mut self) {
        let mut depth = 1usize;
        while depth > 0
            && let Some(token) = self.tokens.get(self.pos)
        {
            match token {
                Token::OpenBrace => depth += 1,
                Token::CloseBrace => depth -= 1,
                _ => {},
            }
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtf::lexer::Lexer;

    fn parse(input: &str) -> Document {
        let tokens = Lexer::new(input.as_bytes()).tokenize().unwrap();
        Parser::new(&tokens).parse().unwrap()
    }

    fn first_paragraph(doc: &Document) -> &Paragraph {
        doc.paragraphs().next().unwrap()
    }

    #[test]
    fn test_rejects_non_rtf() {
        let tokens = Lexer::new(b"hello").tokenize().unwrap();
        assert!(matches!(
            Parser::new(&tokens).parse(),
            Err(RtfError::MissingHeader)
        ));
    }

    #[test]
    fn test_paragraphs_and_formatting() {
        let doc = parse(r"{\rtf1\ansi\deff0{\fonttbl{\f0 Segoe UI;}{\f1\fswiss Arial;}}{\colortbl;\red255\green0\blue0;}\pard\qc Hello {\b\f1\fs32\cf1 bold}\par second\par}");
        assert_eq!(doc.plain_text(), "Hello bold\nsecond");

        let p = first_paragraph(&doc);
        assert_eq!(p.alignment, Alignment::Center);
        let Some(Inline::Run(bold)) = p.inlines.get(1) else {
            panic!("expected bold run");
        };
        assert!(bold.format.bold());
        assert_eq!(bold.format.font_family.as_deref(), Some("Arial"));
        assert_eq!(bold.format.font_size, Some(32.0 / 1.5));
        assert_eq!(bold.format.color, RGBColor::new(255, 0, 0));

        let Some(Inline::Run(plain)) = p.inlines.first() else {
            panic!("expected plain run");
        };
        assert!(plain.format.is_default());
    }

    #[test]
    fn test_line_break_and_spacing() {
        let doc = parse(r"{\rtf1\pard\sl360\slmult1 one\line two\par}");
        let p = first_paragraph(&doc);
        assert_eq!(p.line_spacing, Some(1.5));
        assert_eq!(p.inlines.len(), 3);
        assert_eq!(p.inlines[1], Inline::LineBreak);
        assert_eq!(doc.plain_text(), "one\ntwo");
    }

    #[test]
    fn test_unicode_with_fallback() {
        let doc = parse(r"{\rtf1\uc1 caf\u233?\u-10179?\u-8704? x\par}");
        assert_eq!(doc.plain_text(), "caf\u{e9}\u{1F600} x");
    }

    #[test]
    fn test_hex_uses_code_page() {
        let doc = parse(r"{\rtf1\ansi\ansicpg1251 \'cf\'f0\'e8\par}");
        assert_eq!(doc.plain_text(), "При");
    }

    #[test]
    fn test_skipped_destinations() {
        let doc = parse(r"{\rtf1{\info{\title T}}{\*\generator x;}{\stylesheet{\s0 Normal;}}body\par}");
        assert_eq!(doc.plain_text(), "body");
    }

    #[test]
    fn test_table_with_merge() {
        let doc = parse(concat!(
            r"{\rtf1",
            r"\trowd\clmgf\clbrdrt\brdrs\cellx1000\clmrg\clbrdrt\brdrs\cellx2000\cellx3000",
            r"\pard\intbl wide\cell\pard\intbl\cell\pard\intbl c\cell\row",
            r"\trowd\cellx1000\cellx2000\cellx3000",
            r"\pard\intbl a\par a2\cell\pard\intbl b\cell\pard\intbl\cell\row",
            r"\pard after\par}"
        ));
        let Some(Block::Table(table)) = doc.blocks.first() else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells.len(), 2);
        assert_eq!(table.rows[0].cells[0].column_span, 2);
        assert_eq!(table.rows[0].cells[0].border_thickness, 1.0);
        assert_eq!(table.rows[0].cells[1].border_thickness, 0.0);
        assert_eq!(table.column_count(), 3);
        // Empty cells normalize to one empty paragraph.
        assert_eq!(table.rows[1].cells[2].blocks.len(), 1);
        assert_eq!(doc.plain_text(), "wide\nc\na\na2\nb\n\nafter");
        assert!(doc.blocks[1].is_paragraph());
    }

    #[test]
    fn test_lists_coalesce() {
        let doc = parse(concat!(
            r"{\rtf1",
            r"\pard\ls1{\listtext 1.\tab}one\par",
            r"\pard\ls1{\listtext 2.\tab}two\par",
            r"\pard\ls2{\listtext \u8226?\tab}dot\par",
            r"\pard plain\par}"
        ));
        assert_eq!(doc.blocks.len(), 3);
        let Some(Block::List(ordered)) = doc.blocks.first() else {
            panic!("expected list");
        };
        assert_eq!(ordered.marker, MarkerStyle::Ordered);
        assert_eq!(ordered.items.len(), 2);
        assert_eq!(doc.blocks[1].as_list().map(|l| l.marker), Some(MarkerStyle::Unordered));
        assert_eq!(doc.plain_text(), "one\ntwo\ndot\nplain");
    }

    #[test]
    fn test_trailing_text_without_par() {
        let doc = parse(r"{\rtf1 first\par last}");
        assert_eq!(doc.paragraphs().count(), 2);
    }

    #[test]
    fn test_empty_document_has_one_paragraph() {
        let doc = parse(r"{\rtf1}");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.plain_text(), "");
    }
}
