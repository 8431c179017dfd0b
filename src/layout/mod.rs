//! Table column auto-fit.
//!
//! Column widths are lower bounds derived cell by cell:
//!
//! 1. The column count is the widest row, summing each cell's column span.
//! 2. A cell's content width is its longest visual line. Runs on one line add
//!    up; a line break or the start of another block begins a new line. A
//!    nested table counts as one line as wide as its own columns.
//! 3. Padding and the border on both sides are added, the total is split
//!    evenly across the cell's span, and each spanned column is raised to at
//!    least that share.
//! 4. Every column is clamped to the configured minimum.
//!
//! This is greedy: no cell is ever narrower than its content, but the total
//! table width is not minimized. Two spanning cells that disagree about a
//! shared column are reconciled only by taking the larger share.

mod measure;

use std::fmt;
use std::sync::Arc;

pub use measure::{AverageWidthMeasurer, FontSpec, TextMeasurer};

use crate::config::LayoutOptions;
use crate::document::{Block, CharFormat, Cell, Document, Inline, Paragraph, Table};

/// Compute column widths for `table` with the stock padding and floor.
pub fn layout(
    table: &Table,
    measurer: &dyn TextMeasurer,
    default_font_size: f32,
    default_font_family: &str,
) -> Vec<f32> {
    let options = LayoutOptions::default().with_default_font(default_font_family, default_font_size);
    Fitter {
        options: &options,
        measurer,
    }
    .table_widths(table)
}

/// Table layout engine bound to a measurer and options.
///
/// Cheap to clone; the measurer is shared.
#[derive(Clone)]
pub struct TableLayout {
    options: LayoutOptions,
    measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::new(LayoutOptions::default(), AverageWidthMeasurer::default())
    }
}

impl fmt::Debug for TableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableLayout")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TableLayout {
    pub fn new(options: LayoutOptions, measurer: impl TextMeasurer + Send + Sync + 'static) -> Self {
        Self {
            options,
            measurer: Arc::new(measurer),
        }
    }

    #[inline]
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    fn fitter(&self) -> Fitter<'_> {
        Fitter {
            options: &self.options,
            measurer: self.measurer.as_ref(),
        }
    }

    /// Resolved column widths for `table`, without modifying it.
    pub fn layout(&self, table: &Table) -> Vec<f32> {
        self.fitter().table_widths(table)
    }

    /// Lay out `table` and every table nested in its cells, innermost first.
    pub fn apply(&self, table: &mut Table) {
        for cell in table.cells_mut() {
            self.apply_blocks(&mut cell.blocks);
        }
        table.column_widths = self.layout(table);
    }

    /// Lay out every table in `document`.
    pub fn apply_all(&self, document: &mut Document) {
        self.apply_blocks(&mut document.blocks);
    }

    fn apply_blocks(&self, blocks: &mut [Block]) {
        for block in blocks {
            if let Block::Table(table) = block {
                self.apply(table);
            }
        }
    }
}

struct Fitter<'a> {
    options: &'a LayoutOptions,
    measurer: &'a dyn TextMeasurer,
}

/// Running width of the current visual line and the widest line so far.
#[derive(Default)]
struct Lines {
    current: f32,
    widest: f32,
}

impl Lines {
    fn add(&mut self, width: f32) {
        self.current += width;
        self.widest = self.widest.max(self.current);
    }

    fn break_line(&mut self) {
        self.current = 0.0;
    }
}

impl Fitter<'_> {
    fn table_widths(&self, table: &Table) -> Vec<f32> {
        let mut widths = vec![0.0_f32; table.column_count()];

        for row in &table.rows {
            let mut column = 0;
            for cell in &row.cells {
                let span = cell.span();
                let required = self.cell_width(cell);
                let share = required / span as f32;
                for width in widths.iter_mut().skip(column).take(span) {
                    *width = width.max(share);
                }
                column += span;
            }
        }

        for width in &mut widths {
            *width = width.max(self.options.min_column_width);
        }
        widths
    }

    /// Content width plus padding and border on both sides.
    fn cell_width(&self, cell: &Cell) -> f32 {
        let mut lines = Lines::default();
        self.measure_blocks(&cell.blocks, &mut lines);
        lines.widest + self.options.cell_padding + 2.0 * cell.border_thickness.max(0.0)
    }

    fn measure_blocks(&self, blocks: &[Block], lines: &mut Lines) {
        for block in blocks {
            match block {
                Block::Paragraph(p) => self.measure_paragraph(p, lines),
                Block::List(list) => {
                    for p in list.paragraphs() {
                        self.measure_paragraph(p, lines);
                    }
                },
                Block::Table(table) => {
                    lines.break_line();
                    let widths = if table.column_widths.is_empty() {
                        self.table_widths(table)
                    } else {
                        table.column_widths.clone()
                    };
                    lines.add(widths.iter().sum());
                    lines.break_line();
                },
            }
        }
    }

    fn measure_paragraph(&self, paragraph: &Paragraph, lines: &mut Lines) {
        lines.break_line();
        self.measure_inlines(&paragraph.inlines, &CharFormat::default(), lines);
        lines.break_line();
    }

    fn measure_inlines(&self, inlines: &[Inline], parent: &CharFormat, lines: &mut Lines) {
        for inline in inlines {
            match inline {
                Inline::Run(run) => {
                    let format = run.format.inherit(parent);
                    let font = FontSpec {
                        family: format
                            .font_family
                            .as_deref()
                            .unwrap_or(&self.options.default_font_family),
                        size: format
                            .effective_size()
                            .unwrap_or(self.options.default_font_size),
                        bold: format.bold(),
                        italic: format.italic(),
                    };
                    lines.add(self.measurer.measure(&run.text, &font));
                },
                Inline::LineBreak => lines.break_line(),
                Inline::Span(span) => {
                    let format = span.format.inherit(parent);
                    self.measure_inlines(&span.inlines, &format, lines);
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Row, Run, Span, TextStyle};
    use proptest::prelude::*;

    /// Reads the width straight out of the text, so "92" is 92 units wide.
    fn numeric(text: &str, _: &FontSpec<'_>) -> f32 {
        text.parse().unwrap_or(0.0)
    }

    fn borderless(text: &str) -> Cell {
        Cell::from_text(text).with_border_thickness(0.0)
    }

    fn engine() -> TableLayout {
        TableLayout::new(LayoutOptions::default(), numeric)
    }

    #[test]
    fn test_two_columns_fit_content() {
        // 92 + 8 padding = 100; 42 + 8 = 50
        let table = Table::new(vec![Row::new(vec![borderless("92"), borderless("42")])]);
        assert_eq!(engine().layout(&table), vec![100.0, 50.0]);
    }

    #[test]
    fn test_free_function_matches_engine() {
        let table = Table::new(vec![Row::new(vec![borderless("92"), borderless("42")])]);
        let widths = layout(&table, &numeric, 14.0, "Segoe UI");
        assert_eq!(widths, engine().layout(&table));
    }

    #[test]
    fn test_span_shares_width() {
        // 112 + 8 = 120 across two columns
        let spanning = Table::new(vec![Row::new(vec![borderless("112").with_span(2)])]);
        assert_eq!(engine().layout(&spanning), vec![60.0, 60.0]);

        let mixed = Table::new(vec![
            Row::new(vec![borderless("112").with_span(2)]),
            Row::new(vec![borderless("22"), borderless("72")]),
        ]);
        assert_eq!(engine().layout(&mixed), vec![60.0, 80.0]);
    }

    #[test]
    fn test_floor_and_borders() {
        let table = Table::new(vec![Row::new(vec![
            Cell::from_text("1"),
            Cell::from_text("50").with_border_thickness(2.0),
        ])]);
        // 1 + 8 + 2 < 40; 50 + 8 + 4 = 62
        assert_eq!(engine().layout(&table), vec![40.0, 62.0]);
    }

    #[test]
    fn test_line_break_resets_line() {
        let mut para = Paragraph::from_text("30");
        para.push(Inline::Run(Run::new("30")));
        para.push(Inline::LineBreak);
        para.push(Inline::Run(Run::new("50")));
        let table = Table::new(vec![Row::new(vec![
            Cell::from_blocks(vec![Block::Paragraph(para)]).with_border_thickness(0.0),
        ])]);
        // "30"+"30" on the first line beats "50" on the second
        assert_eq!(engine().layout(&table), vec![68.0]);
    }

    #[test]
    fn test_nested_table_counts_as_line() {
        let inner = Table::new(vec![Row::new(vec![borderless("52"), borderless("52")])]);
        let mut outer = Table::new(vec![Row::new(vec![
            Cell::from_blocks(vec![
                Block::Paragraph(Paragraph::from_text("10")),
                Block::Table(inner),
            ])
            .with_border_thickness(0.0),
        ])]);
        engine().apply(&mut outer);
        assert_eq!(outer.column_widths, vec![128.0]);
        let Some(Block::Table(inner)) = outer.rows[0].cells[0].blocks.get(1) else {
            panic!("nested table missing");
        };
        assert_eq!(inner.column_widths, vec![60.0, 60.0]);
    }

    #[test]
    fn test_defaults_reach_measurer() {
        let seen = |_: &str, font: &FontSpec<'_>| {
            assert_eq!(font.family, "Segoe UI");
            assert_eq!(font.size, 14.0);
            assert!(font.bold);
            0.0
        };
        let para = Paragraph {
            inlines: vec![Inline::Span(Span {
                format: CharFormat {
                    style: TextStyle::BOLD,
                    ..Default::default()
                },
                inlines: vec![Inline::Run(Run::new("x"))],
            })],
            ..Default::default()
        };
        let table = Table::new(vec![Row::new(vec![Cell::from_blocks(vec![Block::Paragraph(para)])])]);
        layout(&table, &seen, 14.0, "Segoe UI");
    }

    #[test]
    fn test_apply_all_and_empty_table() {
        let mut doc = Document::from_blocks(vec![Block::Table(Table::with_size(2, 3))]);
        TableLayout::default().apply_all(&mut doc);
        let Some(Block::Table(table)) = doc.blocks.first() else {
            panic!("table missing");
        };
        assert_eq!(table.column_widths, vec![40.0; 3]);
        assert!(TableLayout::default().layout(&Table::default()).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_widths_respect_floor_and_cells(
            rows in prop::collection::vec(
                prop::collection::vec((0u32..300, 1u32..4), 1..5),
                1..5,
            )
        ) {
            let table = Table::new(
                rows.iter()
                    .map(|cells| Row::new(
                        cells.iter()
                            .map(|(w, span)| borderless(&w.to_string()).with_span(*span))
                            .collect(),
                    ))
                    .collect(),
            );
            let widths = engine().layout(&table);
            prop_assert_eq!(widths.len(), table.column_count());
            prop_assert!(widths.iter().all(|w| *w >= 40.0));

            for row in &table.rows {
                let mut column = 0;
                for cell in &row.cells {
                    let required: f32 = cell.blocks[0].as_paragraph().map_or(0.0, |p| {
                        p.text().parse::<f32>().unwrap_or(0.0)
                    }) + 8.0;
                    let covered: f32 = widths[column..column + cell.span()].iter().sum();
                    prop_assert!(covered + 1e-3 >= required);
                    column += cell.span();
                }
            }

            prop_assert_eq!(widths, engine().layout(&table));
        }
    }
}
