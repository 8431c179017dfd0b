//! `word/document.xml` to [`Document`].
//!
//! A pull parser over the body. Paragraphs carrying numbering properties are
//! gathered into one ordered [`List`] while they stay consecutive. Unknown
//! elements are skipped whole; a few wrappers (`w:sdt`, `w:hyperlink`,
//! `w:ins`, ...) are read through so their runs are kept.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::common::{Error, RGBColor, Result, unit};
use crate::document::{
    Alignment, Block, Cell, CharFormat, DEFAULT_BORDER_THICKNESS, Document, Inline, List,
    MarkerStyle, Paragraph, Row, Run, Table, TextStyle,
};

/// Parse a main document part.
pub fn read_document(xml: &[u8]) -> Result<Document> {
    let mut body = BodyReader::new(xml);
    loop {
        match body.next()? {
            Event::Start(e) if e.local_name().as_ref() == b"body" => {
                let blocks = body.read_blocks(b"body", None)?;
                let mut document = Document::from_blocks(blocks);
                if document.blocks.is_empty() {
                    document.push(Block::Paragraph(Paragraph::new()));
                }
                document.normalize();
                return Ok(document);
            },
            Event::Eof => {
                return Err(Error::InvalidFormat("document part has no w:body".to_string()));
            },
            _ => {},
        }
    }
}

/// Properties gathered from `w:tcPr`.
#[derive(Debug, Clone, Copy)]
struct CellProps {
    span: u32,
    bordered: bool,
}

impl Default for CellProps {
    fn default() -> Self {
        Self {
            span: 1,
            bordered: true,
        }
    }
}

/// Counts border sides and how many of them are switched off.
#[derive(Debug, Default)]
struct BorderSides {
    sides: usize,
    cleared: usize,
}

impl BorderSides {
    fn record(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if matches!(
            e.local_name().as_ref(),
            b"top" | b"left" | b"bottom" | b"right" | b"start" | b"end"
        ) {
            self.sides += 1;
            if matches!(attr(e, b"val")?.as_deref(), Some("nil" | "none")) {
                self.cleared += 1;
            }
        }
        Ok(())
    }

    /// True when borders were listed and every one of them is off.
    fn all_cleared(&self) -> bool {
        self.sides > 0 && self.sides == self.cleared
    }
}

struct BodyReader<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> BodyReader<'a> {
    fn new(xml: &'a [u8]) -> Self {
        Self {
            reader: Reader::from_reader(xml),
        }
    }

    fn next(&mut self) -> Result<Event<'a>> {
        Ok(self.reader.read_event()?)
    }

    /// Skip an element whose start tag was just read.
    fn skip(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.reader.read_to_end(e.name())?;
        Ok(())
    }

    /// Read block content up to the end tag named `end`. Inside a table cell,
    /// `cell` receives the cell's `w:tcPr`.
    fn read_blocks(&mut self, end: &[u8], mut cell: Option<&mut CellProps>) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut list = None;

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"p" => {
                        let (paragraph, numbered) = self.read_paragraph()?;
                        push_paragraph(&mut blocks, &mut list, paragraph, numbered);
                    },
                    b"tbl" => {
                        close_list(&mut blocks, &mut list);
                        let table = self.read_table()?;
                        blocks.push(Block::Table(table));
                    },
                    b"tcPr" => match cell.as_deref_mut() {
                        Some(props) => self.read_cell_props(props)?,
                        None => self.skip(&e)?,
                    },
                    b"sdt" | b"sdtContent" | b"customXml" | b"ins" => {},
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) if e.local_name().as_ref() == b"p" => {
                    push_paragraph(&mut blocks, &mut list, Paragraph::new(), false);
                },
                Event::End(e) if e.local_name().as_ref() == end => break,
                Event::Eof => break,
                _ => {},
            }
        }

        close_list(&mut blocks, &mut list);
        Ok(blocks)
    }

    /// Returns the paragraph and whether it carries numbering.
    fn read_paragraph(&mut self) -> Result<(Paragraph, bool)> {
        let mut paragraph = Paragraph::default();
        let mut numbered = false;

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"pPr" => numbered = self.read_paragraph_props(&mut paragraph)?,
                    b"r" => self.read_run(&mut paragraph.inlines)?,
                    b"hyperlink" | b"ins" | b"smartTag" | b"fldSimple" | b"customXml" | b"sdt"
                    | b"sdtContent" => {},
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.local_name().as_ref() == b"p" => break,
                Event::Eof => break,
                _ => {},
            }
        }

        paragraph.ensure_inline();
        Ok((paragraph, numbered))
    }

    fn read_paragraph_props(&mut self, paragraph: &mut Paragraph) -> Result<bool> {
        let mut numbered = false;

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"numPr" => numbered = true,
                    b"jc" | b"spacing" => paragraph_property(&e, paragraph)?,
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    // numId 0 switches inherited numbering off
                    b"numId" if attr(&e, b"val")?.as_deref() == Some("0") => numbered = false,
                    _ => paragraph_property(&e, paragraph)?,
                },
                Event::End(e) if e.local_name().as_ref() == b"pPr" => break,
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(numbered)
    }

    fn read_run(&mut self, inlines: &mut Vec<Inline>) -> Result<()> {
        let mut format = CharFormat::default();

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"rPr" => format = self.read_run_props()?,
                    b"t" => {
                        let text = self.read_text(b"t")?;
                        inlines.extend(Inline::runs_from_text(&text, &format));
                    },
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"br" | b"cr" => inlines.push(Inline::LineBreak),
                    b"tab" => inlines.push(Inline::Run(Run::with_format("\t", format.clone()))),
                    _ => {},
                },
                Event::End(e) if e.local_name().as_ref() == b"r" => break,
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(())
    }

    fn read_run_props(&mut self) -> Result<CharFormat> {
        let mut format = CharFormat::default();

        loop {
            match self.next()? {
                Event::Start(e) => {
                    if !run_property(&e, &mut format)? {
                        self.skip(&e)?;
                    }
                },
                Event::Empty(e) => {
                    run_property(&e, &mut format)?;
                },
                Event::End(e) if e.local_name().as_ref() == b"rPr" => break,
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(format)
    }

    /// Character data up to the end tag named `end`, entities resolved.
    fn read_text(&mut self, end: &[u8]) -> Result<String> {
        let mut text = String::new();

        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(utf8(t.as_ref())?),
                Event::CData(t) => text.push_str(utf8(t.as_ref())?),
                Event::GeneralRef(r) => {
                    if let Some(ch) = r.resolve_char_ref()? {
                        text.push(ch);
                    } else if let Some(s) = quick_xml::escape::resolve_predefined_entity(utf8(r.as_ref())?) {
                        text.push_str(s);
                    }
                },
                Event::End(e) if e.local_name().as_ref() == end => break,
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(text)
    }

    fn read_table(&mut self) -> Result<Table> {
        let mut table = Table::default();

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tblPr" => table.border_thickness = self.read_table_props()?,
                    b"tr" => table.rows.push(self.read_row()?),
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.local_name().as_ref() == b"tbl" => break,
                Event::Eof => break,
                _ => {},
            }
        }

        for cell in table.cells_mut() {
            cell.normalize_empty();
        }
        Ok(table)
    }

    /// Border thickness from `w:tblBorders`.
    fn read_table_props(&mut self) -> Result<f32> {
        let mut borders = BorderSides::default();
        let mut in_borders = false;

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tblBorders" => in_borders = true,
                    _ if in_borders => borders.record(&e)?,
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) if in_borders => borders.record(&e)?,
                Event::End(e) => match e.local_name().as_ref() {
                    b"tblBorders" => in_borders = false,
                    b"tblPr" => break,
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(if borders.all_cleared() { 0.0 } else { DEFAULT_BORDER_THICKNESS })
    }

    fn read_row(&mut self) -> Result<Row> {
        let mut row = Row::default();

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tc" => row.cells.push(self.read_cell()?),
                    b"sdt" | b"sdtContent" | b"customXml" => {},
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) if e.local_name().as_ref() == b"tc" => row.cells.push(Cell::new()),
                Event::End(e) if e.local_name().as_ref() == b"tr" => break,
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(row)
    }

    fn read_cell(&mut self) -> Result<Cell> {
        let mut props = CellProps::default();
        let mut blocks = self.read_blocks(b"tc", Some(&mut props))?;
        drop_table_filler(&mut blocks);
        let thickness = if props.bordered { DEFAULT_BORDER_THICKNESS } else { 0.0 };
        Ok(Cell::from_blocks(blocks)
            .with_span(props.span)
            .with_border_thickness(thickness))
    }

    fn read_cell_props(&mut self, props: &mut CellProps) -> Result<()> {
        let mut borders = BorderSides::default();
        let mut in_borders = false;

        loop {
            match self.next()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tcBorders" => in_borders = true,
                    _ if in_borders => borders.record(&e)?,
                    b"gridSpan" => props.span = grid_span(&e)?,
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"gridSpan" => props.span = grid_span(&e)?,
                    _ if in_borders => borders.record(&e)?,
                    _ => {},
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"tcBorders" => in_borders = false,
                    b"tcPr" => break,
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
        }

        props.bordered = !borders.all_cleared();
        Ok(())
    }
}

/// A cell must end with a paragraph, so a cell whose content ends in a
/// table carries an empty filler paragraph after it. Drop that filler.
fn drop_table_filler(blocks: &mut Vec<Block>) {
    let filler = matches!(
        blocks.as_slice(),
        [.., Block::Table(_), Block::Paragraph(last)] if last.text().is_empty()
    );
    if filler {
        blocks.pop();
    }
}

fn push_paragraph(blocks: &mut Vec<Block>, list: &mut Option<List>, paragraph: Paragraph, numbered: bool) {
    if numbered {
        list.get_or_insert_with(|| List::new(MarkerStyle::Ordered))
            .push(paragraph);
    } else {
        close_list(blocks, list);
        blocks.push(Block::Paragraph(paragraph));
    }
}

fn close_list(blocks: &mut Vec<Block>, list: &mut Option<List>) {
    if let Some(list) = list.take() {
        blocks.push(Block::List(list));
    }
}

fn paragraph_property(e: &BytesStart<'_>, paragraph: &mut Paragraph) -> Result<()> {
    match e.local_name().as_ref() {
        b"jc" => {
            paragraph.alignment = match attr(e, b"val")?.as_deref() {
                Some("center") => Alignment::Center,
                Some("right") => Alignment::Right,
                Some("both") => Alignment::Justify,
                _ => Alignment::Left,
            };
        },
        b"spacing" => {
            // `w:line` counts 240ths of a line only under the auto rule
            let auto = matches!(attr(e, b"lineRule")?.as_deref(), None | Some("auto"));
            if auto
                && let Some(line) = attr(e, b"line")?
                && let Ok(units) = line.parse::<i32>()
            {
                paragraph.line_spacing = unit::line_units_to_factor(units);
            }
        },
        _ => {},
    }
    Ok(())
}

/// Apply one run property; false if the element is not one.
fn run_property(e: &BytesStart<'_>, format: &mut CharFormat) -> Result<bool> {
    match e.local_name().as_ref() {
        b"b" => format.style.set(TextStyle::BOLD, toggle(e)?),
        b"i" => format.style.set(TextStyle::ITALIC, toggle(e)?),
        b"u" => {
            let on = !matches!(attr(e, b"val")?.as_deref(), Some("none"));
            format.style.set(TextStyle::UNDERLINE, on);
        },
        b"color" => {
            if let Some(color) = attr(e, b"val")?.as_deref().and_then(RGBColor::from_hex) {
                format.color = color;
            }
        },
        b"rFonts" => {
            if let Some(family) = attr(e, b"ascii")?.or(attr(e, b"hAnsi")?) {
                format.font_family = Some(family);
            }
        },
        b"sz" => {
            if let Some(half_points) = attr(e, b"val")?.and_then(|v| v.parse::<i32>().ok())
                && half_points > 0
            {
                format.font_size = Some(unit::half_points_to_px(half_points));
            }
        },
        _ => return Ok(false),
    }
    Ok(true)
}

/// An on/off property: present means on unless `w:val` says otherwise.
fn toggle(e: &BytesStart<'_>) -> Result<bool> {
    Ok(!matches!(
        attr(e, b"val")?.as_deref(),
        Some("0" | "false" | "off" | "none")
    ))
}

fn grid_span(e: &BytesStart<'_>) -> Result<u32> {
    Ok(attr(e, b"val")?
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1))
}

/// Unescaped value of the attribute whose local name is `key`.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::constants::namespace;

    fn body(content: &str) -> Document {
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
            namespace::WML_MAIN,
            content
        );
        read_document(xml.as_bytes()).unwrap()
    }

    fn only_paragraph(doc: &Document) -> &Paragraph {
        doc.blocks.first().and_then(Block::as_paragraph).unwrap()
    }

    #[test]
    fn test_paragraph_properties() {
        let doc = body(
            r#"<w:p><w:pPr><w:spacing w:after="0" w:line="360" w:lineRule="auto"/><w:jc w:val="both"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#,
        );
        let p = only_paragraph(&doc);
        assert_eq!(p.alignment, Alignment::Justify);
        assert_eq!(p.line_spacing, Some(1.5));
    }

    #[test]
    fn test_small_line_value_clamps_to_single() {
        let doc = body(r#"<w:p><w:pPr><w:spacing w:line="120"/></w:pPr></w:p>"#);
        assert_eq!(only_paragraph(&doc).line_spacing, Some(1.0));
        let exact = body(r#"<w:p><w:pPr><w:spacing w:line="360" w:lineRule="exact"/></w:pPr></w:p>"#);
        assert_eq!(only_paragraph(&exact).line_spacing, None);
    }

    #[test]
    fn test_run_properties_and_breaks() {
        let doc = body(concat!(
            r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="Arial"/><w:b/><w:i w:val="0"/><w:u w:val="single"/>"#,
            r#"<w:color w:val="FF0000"/><w:sz w:val="24"/></w:rPr><w:t xml:space="preserve">a &amp; b </w:t>"#,
            r#"<w:br/><w:t>c&#233;</w:t><w:tab/></w:r></w:p>"#
        ));
        let p = only_paragraph(&doc);
        let first = p.inlines[0].as_run().unwrap();
        assert_eq!(first.text, "a & b ");
        assert_eq!(first.format.font_family.as_deref(), Some("Arial"));
        assert_eq!(first.format.font_size, Some(16.0));
        assert!(first.format.bold() && !first.format.italic() && first.format.underline());
        assert_eq!(first.format.color, RGBColor::new(255, 0, 0));
        assert_eq!(p.inlines[1], Inline::LineBreak);
        assert_eq!(doc.plain_text(), "a & b \nc\u{e9}\t");
    }

    #[test]
    fn test_numbered_paragraphs_coalesce() {
        let numbered = r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>item</w:t></w:r></w:p>"#;
        let plain = r#"<w:p><w:r><w:t>text</w:t></w:r></w:p>"#;
        let doc = body(&[numbered, numbered, plain, numbered].concat());
        assert_eq!(doc.blocks.len(), 3);
        let list = doc.blocks[0].as_list().unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.marker, MarkerStyle::Ordered);
        assert!(doc.blocks[2].as_list().is_some());
    }

    #[test]
    fn test_table_spans_and_borders() {
        let doc = body(concat!(
            r#"<w:tbl><w:tblPr><w:tblBorders><w:top w:val="nil"/><w:left w:val="none"/>"#,
            r#"<w:bottom w:val="nil"/><w:right w:val="nil"/></w:tblBorders></w:tblPr>"#,
            r#"<w:tblGrid><w:gridCol w:w="100"/><w:gridCol w:w="100"/></w:tblGrid>"#,
            r#"<w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>wide</w:t></w:r></w:p></w:tc></w:tr>"#,
            r#"<w:tr><w:tc><w:tcPr><w:tcBorders><w:top w:val="nil"/><w:bottom w:val="nil"/></w:tcBorders></w:tcPr></w:tc>"#,
            r#"<w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        ));
        let table = doc.blocks[0].as_table().unwrap();
        assert_eq!(table.border_thickness, 0.0);
        assert_eq!(table.rows[0].cells[0].span(), 2);
        let empty = &table.rows[1].cells[0];
        assert_eq!(empty.border_thickness, 0.0);
        assert_eq!(empty.blocks.len(), 1);
        assert_eq!(table.rows[1].cells[1].border_thickness, 1.0);
        assert_eq!(doc.plain_text(), "wide\n\nb");
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let doc = body(concat!(
            r#"<w:p><w:r><w:drawing><w:t>hidden</w:t></w:drawing><w:t>shown</w:t></w:r>"#,
            r#"<w:hyperlink><w:r><w:t>link</w:t></w:r></w:hyperlink><w:del><w:r><w:delText>gone</w:delText></w:r></w:del></w:p>"#,
            r#"<w:sectPr><w:pgSz w:w="12240"/></w:sectPr>"#,
        ));
        assert_eq!(doc.plain_text(), "shownlink");
    }

    #[test]
    fn test_empty_body_has_one_paragraph() {
        let doc = body("");
        assert_eq!(doc.paragraphs().count(), 1);
    }

    #[test]
    fn test_missing_body_is_invalid() {
        assert!(matches!(
            read_document(b"<w:document/>"),
            Err(Error::InvalidFormat(_))
        ));
    }
}
