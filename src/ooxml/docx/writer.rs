//! [`Document`] to a minimal Word package.
//!
//! Run properties are written only when they differ from the defaults.
//! Tables get single-line borders on every edge and gridline when their
//! thickness is non-zero and `nil` borders otherwise; the thickness itself is
//! not kept. Grid columns come from the resolved column widths.

use std::fmt::Write as FmtWrite;

use super::escape_xml;
use super::package::{PackageWriter, relationships_xml};
use crate::common::{Error, Result, unit};
use crate::document::{Alignment, Block, CharFormat, Document, Inline, MarkerStyle, Paragraph, Table};
use crate::ooxml::constants::{content_type as ct, namespace, part_name, relationship_type};

/// `w:numId` of the decimal numbering definition.
pub const DECIMAL_NUM_ID: u32 = 1;
/// `w:numId` of the bullet numbering definition.
pub const BULLET_NUM_ID: u32 = 2;

/// Grid column width (twips) for tables without resolved widths.
const FALLBACK_COLUMN_TWIPS: i32 = 2880;

const TABLE_EDGES: [&str; 6] = ["top", "left", "bottom", "right", "insideH", "insideV"];
const CELL_EDGES: [&str; 4] = ["top", "left", "bottom", "right"];

/// Build the complete package for `document`.
pub fn write_package(document: &Document) -> Result<Vec<u8>> {
    let document_xml = write_document_xml(document)?;

    let mut package = PackageWriter::new();
    package.add_part(
        part_name::PACKAGE_RELS,
        None,
        relationships_xml(&[("rId1", relationship_type::OFFICE_DOCUMENT, part_name::DOCUMENT)]).as_bytes(),
    )?;
    package.add_part(part_name::DOCUMENT, Some(ct::WML_DOCUMENT_MAIN), document_xml.as_bytes())?;
    package.add_part(
        part_name::DOCUMENT_RELS,
        None,
        relationships_xml(&[("rId1", relationship_type::NUMBERING, "numbering.xml")]).as_bytes(),
    )?;
    package.add_part(part_name::NUMBERING, Some(ct::WML_NUMBERING), numbering_xml().as_bytes())?;
    package.finish()
}

/// Serialize the main document part.
pub fn write_document_xml(document: &Document) -> Result<String> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<w:document xmlns:w="{}" xmlns:r="{}"><w:body>"#,
        namespace::WML_MAIN,
        namespace::OFC_RELATIONSHIPS
    )
    .map_err(|e| Error::Xml(e.to_string()))?;

    write_blocks(&mut xml, &document.blocks)?;

    // US Letter with one inch margins
    xml.push_str(concat!(
        r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#,
        r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#,
        "</w:sectPr>"
    ));
    xml.push_str("</w:body></w:document>");
    Ok(xml)
}

fn write_blocks(xml: &mut String, blocks: &[Block]) -> Result<()> {
    for block in blocks {
        match block {
            Block::Paragraph(p) => write_paragraph(xml, p, None)?,
            Block::List(list) => {
                let num_id = match list.marker {
                    MarkerStyle::Ordered => DECIMAL_NUM_ID,
                    MarkerStyle::Unordered => BULLET_NUM_ID,
                };
                for p in list.paragraphs() {
                    write_paragraph(xml, p, Some(num_id))?;
                }
            },
            Block::Table(table) => write_table(xml, table)?,
        }
    }
    Ok(())
}

fn write_paragraph(xml: &mut String, paragraph: &Paragraph, num_id: Option<u32>) -> Result<()> {
    xml.push_str("<w:p>");

    let jc = match paragraph.alignment {
        Alignment::Left => None,
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
        Alignment::Justify => Some("both"),
    };
    if num_id.is_some() || paragraph.line_spacing.is_some() || jc.is_some() {
        xml.push_str("<w:pPr>");

        if let Some(num_id) = num_id {
            write!(xml, r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="{}"/></w:numPr>"#, num_id)
                .map_err(|e| Error::Xml(e.to_string()))?;
        }

        if let Some(factor) = paragraph.line_spacing {
            write!(
                xml,
                r#"<w:spacing w:line="{}" w:lineRule="auto"/>"#,
                unit::factor_to_line_units(factor)
            )
            .map_err(|e| Error::Xml(e.to_string()))?;
        }

        if let Some(jc) = jc {
            write!(xml, r#"<w:jc w:val="{}"/>"#, jc).map_err(|e| Error::Xml(e.to_string()))?;
        }

        xml.push_str("</w:pPr>");
    }

    write_inlines(xml, &paragraph.inlines, &CharFormat::default())?;
    xml.push_str("</w:p>");
    Ok(())
}

fn write_inlines(xml: &mut String, inlines: &[Inline], parent: &CharFormat) -> Result<()> {
    for inline in inlines {
        match inline {
            Inline::Run(run) => write_run(xml, &run.text, &run.format.inherit(parent))?,
            Inline::LineBreak => xml.push_str("<w:r><w:br/></w:r>"),
            Inline::Span(span) => write_inlines(xml, &span.inlines, &span.format.inherit(parent))?,
        }
    }
    Ok(())
}

fn write_run(xml: &mut String, text: &str, format: &CharFormat) -> Result<()> {
    xml.push_str("<w:r>");
    write_run_properties(xml, format)?;

    // Embedded breaks become w:br, tabs w:tab; the reader maps both back.
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.push_str("<w:br/>");
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                xml.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                write!(xml, r#"<w:t xml:space="preserve">{}</w:t>"#, escape_xml(piece))
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
        }
    }

    xml.push_str("</w:r>");
    Ok(())
}

fn write_run_properties(xml: &mut String, format: &CharFormat) -> Result<()> {
    if format.is_default() {
        return Ok(());
    }

    xml.push_str("<w:rPr>");

    if let Some(family) = &format.font_family {
        let family = escape_xml(family);
        write!(xml, r#"<w:rFonts w:ascii="{}" w:hAnsi="{}"/>"#, family, family)
            .map_err(|e| Error::Xml(e.to_string()))?;
    }
    if format.bold() {
        xml.push_str("<w:b/>");
    }
    if format.italic() {
        xml.push_str("<w:i/>");
    }
    if !format.color.is_black() {
        write!(xml, r#"<w:color w:val="{}"/>"#, format.color.to_hex())
            .map_err(|e| Error::Xml(e.to_string()))?;
    }
    if let Some(size) = format.effective_size() {
        write!(xml, r#"<w:sz w:val="{}"/>"#, unit::px_to_half_points(size))
            .map_err(|e| Error::Xml(e.to_string()))?;
    }
    if format.underline() {
        xml.push_str(r#"<w:u w:val="single"/>"#);
    }

    xml.push_str("</w:rPr>");
    Ok(())
}

fn write_table(xml: &mut String, table: &Table) -> Result<()> {
    xml.push_str("<w:tbl><w:tblPr>");
    xml.push_str(r#"<w:tblW w:w="0" w:type="auto"/>"#);
    write_borders(xml, "tblBorders", &TABLE_EDGES, table.border_thickness > 0.0)?;
    xml.push_str("</w:tblPr>");

    let columns: Vec<i32> = (0..table.column_count())
        .map(|c| {
            table
                .column_widths
                .get(c)
                .map_or(FALLBACK_COLUMN_TWIPS, |w| unit::px_to_twips(*w))
        })
        .collect();

    xml.push_str("<w:tblGrid>");
    for width in &columns {
        write!(xml, r#"<w:gridCol w:w="{}"/>"#, width).map_err(|e| Error::Xml(e.to_string()))?;
    }
    xml.push_str("</w:tblGrid>");

    for row in &table.rows {
        xml.push_str("<w:tr>");
        let mut column = 0;
        for cell in &row.cells {
            let span = cell.span();
            let width: i32 = columns.iter().skip(column).take(span).sum();
            column += span;

            xml.push_str("<w:tc><w:tcPr>");
            write!(xml, r#"<w:tcW w:w="{}" w:type="dxa"/>"#, width)
                .map_err(|e| Error::Xml(e.to_string()))?;
            if span > 1 {
                write!(xml, r#"<w:gridSpan w:val="{}"/>"#, span)
                    .map_err(|e| Error::Xml(e.to_string()))?;
            }
            write_borders(xml, "tcBorders", &CELL_EDGES, cell.border_thickness > 0.0)?;
            xml.push_str("</w:tcPr>");

            write_blocks(xml, &cell.blocks)?;
            // A cell must end with a paragraph
            if !matches!(cell.blocks.last(), Some(Block::Paragraph(_) | Block::List(_))) {
                xml.push_str("<w:p/>");
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    Ok(())
}

fn write_borders(xml: &mut String, element: &str, edges: &[&str], visible: bool) -> Result<()> {
    write!(xml, "<w:{}>", element).map_err(|e| Error::Xml(e.to_string()))?;
    for edge in edges {
        let written = if visible {
            write!(
                xml,
                r#"<w:{} w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
                edge
            )
        } else {
            write!(xml, r#"<w:{} w:val="nil"/>"#, edge)
        };
        written.map_err(|e| Error::Xml(e.to_string()))?;
    }
    write!(xml, "</w:{}>", element).map_err(|e| Error::Xml(e.to_string()))?;
    Ok(())
}

/// Numbering definitions: decimal for ordered lists, bullet for unordered.
fn numbering_xml() -> String {
    let level = |format: &str, text: &str| {
        format!(
            concat!(
                r#"<w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/>"#,
                r#"<w:numFmt w:val="{}"/><w:lvlText w:val="{}"/><w:lvlJc w:val="left"/>"#,
                r#"<w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl>"#
            ),
            format, text
        )
    };

    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(r#"<w:numbering xmlns:w="{}">"#, namespace::WML_MAIN));
    xml.push_str(&format!(
        r#"<w:abstractNum w:abstractNumId="0">{}</w:abstractNum>"#,
        level("decimal", "%1.")
    ));
    xml.push_str(&format!(
        r#"<w:abstractNum w:abstractNumId="1">{}</w:abstractNum>"#,
        level("bullet", "\u{2022}")
    ));
    xml.push_str(&format!(
        r#"<w:num w:numId="{}"><w:abstractNumId w:val="0"/></w:num>"#,
        DECIMAL_NUM_ID
    ));
    xml.push_str(&format!(
        r#"<w:num w:numId="{}"><w:abstractNumId w:val="1"/></w:num>"#,
        BULLET_NUM_ID
    ));
    xml.push_str("</w:numbering>");
    xml
}
