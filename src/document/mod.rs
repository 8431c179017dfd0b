//! The in-memory rich-text document model.
//!
//! A [`Document`] is an ordered sequence of [`Block`]s. Blocks are
//! paragraphs, tables (whose cells hold further blocks) and lists (whose
//! items each wrap one paragraph). Paragraphs hold [`Inline`]s: runs of
//! formatted text, explicit line breaks, and spans that nest formatting.
//!
//! The model knows nothing about persisted formats; the codecs in
//! [`crate::codec`], [`crate::rtf`] and [`crate::ooxml`] map to and from it.
//!
//! # Examples
//!
//! ```rust
//! use folio::document::{Block, Cell, Document, Paragraph, Row, Table};
//!
//! let mut doc = Document::new();
//! doc.push(Block::Paragraph(Paragraph::from_text("Title")));
//! doc.push(Block::Table(Table::new(vec![Row::new(vec![
//!     Cell::from_text("a"),
//!     Cell::from_text("b"),
//! ])])));
//!
//! assert_eq!(doc.plain_text(), "Title\na\nb");
//! assert_eq!(doc.blocks().count(), 4);
//! ```

mod list;
mod paragraph;
mod table;

pub use list::{List, ListItem, MarkerStyle};
pub use paragraph::{Alignment, CharFormat, Inline, Paragraph, Run, Span, TextStyle};
pub use table::{Cell, DEFAULT_BORDER_THICKNESS, Row, Table};

/// A structural document unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    List(List),
}

impl Block {
    #[inline]
    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(_))
    }

    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, Block::Table(_))
    }

    #[inline]
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Block::List(l) => Some(l),
            _ => None,
        }
    }
}

/// A rich-text document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// A document holding one unformatted paragraph of `text`.
    pub fn from_text(text: &str) -> Self {
        Self::from_blocks(vec![Block::Paragraph(Paragraph::from_text(text))])
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Depth-first, pre-order iteration over every block, descending into
    /// table cells.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            stack: vec![self.blocks.iter()],
        }
    }

    /// Every paragraph in document order, including list items and
    /// paragraphs inside table cells.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks().flat_map(block_paragraphs)
    }

    /// Plain-text projection.
    ///
    /// Each paragraph reached in document order is one line; lines are joined
    /// with `\n`. Line breaks inside a paragraph also become `\n`. A table
    /// cell without blocks counts as one empty line.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        let mut first = true;
        push_blocks_text(&self.blocks, &mut out, &mut first);
        out
    }

    /// True when the projection has no visible characters.
    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    /// Guarantee every paragraph, list item and table cell satisfies the
    /// non-empty invariants.
    pub fn normalize(&mut self) {
        normalize_blocks(&mut self.blocks);
    }
}

fn block_paragraphs(block: &Block) -> Box<dyn Iterator<Item = &Paragraph> + '_> {
    match block {
        Block::Paragraph(p) => Box::new(std::iter::once(p)),
        Block::List(list) => Box::new(list.paragraphs()),
        Block::Table(_) => Box::new(std::iter::empty()),
    }
}

fn push_line(out: &mut String, first: &mut bool, line: &str) {
    if !*first {
        out.push('\n');
    }
    *first = false;
    out.push_str(line);
}

fn push_blocks_text(blocks: &[Block], out: &mut String, first: &mut bool) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => push_line(out, first, &p.text()),
            Block::List(list) => {
                for p in list.paragraphs() {
                    push_line(out, first, &p.text());
                }
            },
            Block::Table(table) => {
                for cell in table.cells() {
                    if cell.blocks.is_empty() {
                        push_line(out, first, "");
                    } else {
                        push_blocks_text(&cell.blocks, out, first);
                    }
                }
            },
        }
    }
}

fn normalize_blocks(blocks: &mut [Block]) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => p.ensure_inline(),
            Block::List(list) => {
                for item in &mut list.items {
                    item.paragraph.ensure_inline();
                }
            },
            Block::Table(table) => {
                for cell in table.cells_mut() {
                    cell.normalize_empty();
                    normalize_blocks(&mut cell.blocks);
                }
            },
        }
    }
}

/// Depth-first block iterator returned by [`Document::blocks`].
pub struct Blocks<'a> {
    stack: Vec<std::slice::Iter<'a, Block>>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(block) => {
                    if let Block::Table(table) = block {
                        // Reverse so the first cell is visited first.
                        for row in table.rows.iter().rev() {
                            for cell in row.cells.iter().rev() {
                                self.stack.push(cell.blocks.iter());
                            }
                        }
                    }
                    return Some(block);
                },
                None => {
                    self.stack.pop();
                },
            }
        }
    }
}
