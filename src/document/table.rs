//! Tables: rows of cells, each cell holding nested blocks.

use super::{Block, Paragraph};

/// Default border thickness for tables and cells built by the editor.
pub const DEFAULT_BORDER_THICKNESS: f32 = 1.0;

/// A table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub blocks: Vec<Block>,
    /// Number of layout columns this cell covers.
    pub column_span: u32,
    pub border_thickness: f32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            column_span: 1,
            border_thickness: DEFAULT_BORDER_THICKNESS,
        }
    }
}

impl Cell {
    /// Create a cell holding one empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::Paragraph(Paragraph::new())],
            ..Default::default()
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Default::default()
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_blocks(vec![Block::Paragraph(Paragraph::from_text(text))])
    }

    #[inline]
    pub fn with_span(mut self, span: u32) -> Self {
        self.column_span = span;
        self
    }

    #[inline]
    pub fn with_border_thickness(mut self, thickness: f32) -> Self {
        self.border_thickness = thickness;
        self
    }

    /// Column span, never less than one.
    #[inline]
    pub fn span(&self) -> usize {
        self.column_span.max(1) as usize
    }

    /// Replace an empty block list with one paragraph holding one empty run.
    pub fn normalize_empty(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::Paragraph(Paragraph::new()));
        }
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Sum of the column spans of every cell in this row.
    pub fn span_total(&self) -> usize {
        self.cells.iter().map(Cell::span).sum()
    }
}

/// A table with resolved column widths.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Row>,
    /// Column widths in device-independent pixels, filled in by
    /// [`TableLayout`](crate::layout::TableLayout). Empty until laid out.
    pub column_widths: Vec<f32>,
    pub border_thickness: f32,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            column_widths: Vec::new(),
            border_thickness: DEFAULT_BORDER_THICKNESS,
        }
    }
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Build a blank `rows` × `columns` grid of single-span cells, each
    /// holding one empty paragraph.
    pub fn with_size(rows: usize, columns: usize) -> Self {
        let rows = (0..rows)
            .map(|_| Row::new((0..columns).map(|_| Cell::new()).collect()))
            .collect();
        Self::new(rows)
    }

    #[inline]
    pub fn with_border_thickness(mut self, thickness: f32) -> Self {
        self.border_thickness = thickness;
        self
    }

    /// Number of layout columns: the widest row by summed column span.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Row::span_total).max().unwrap_or(0)
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().flat_map(|row| row.cells.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_size() {
        let table = Table::with_size(3, 4);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 4);
        assert!(table.cells().all(|c| c.blocks.len() == 1 && c.span() == 1));
        assert!(table.column_widths.is_empty());
    }

    #[test]
    fn test_column_count_uses_spans() {
        let table = Table::new(vec![
            Row::new(vec![Cell::from_text("wide").with_span(3)]),
            Row::new(vec![Cell::from_text("a"), Cell::from_text("b")]),
        ]);
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_zero_span_counts_as_one() {
        let cell = Cell::from_text("x").with_span(0);
        assert_eq!(cell.span(), 1);
    }

    #[test]
    fn test_normalize_empty() {
        let mut cell = Cell::from_blocks(Vec::new());
        cell.normalize_empty();
        assert_eq!(cell.blocks.len(), 1);
    }
}
