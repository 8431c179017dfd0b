//! ZIP container of a Word package.
//!
//! [`PackageReader`] finds the main document part through the package
//! relationships; [`PackageWriter`] collects parts and emits
//! `[Content_Types].xml` when finished.

use std::io::{Cursor, Read, Write};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use super::escape_xml;
use crate::common::{Error, Result};
use crate::ooxml::constants::{content_type as ct, namespace, part_name, relationship_type};

/// Read access to the parts of a package held in memory.
pub struct PackageReader<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> PackageReader<'a> {
    /// Open a package from its bytes.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| Error::InvalidFormat("Invalid ZIP archive".to_string()))?;
        Ok(Self { archive })
    }

    pub fn has_part(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    /// Read one part by its name inside the archive (no leading slash).
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::InvalidFormat(format!("Part not found: {}", name)))?;

        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Name of the main document part.
    ///
    /// Taken from the `officeDocument` relationship in `_rels/.rels`, falling
    /// back to `word/document.xml` when the package has no such relationship.
    pub fn main_document_name(&mut self) -> Result<String> {
        if !self.has_part(part_name::PACKAGE_RELS) {
            return Ok(part_name::DOCUMENT.to_string());
        }

        let rels = self.read_part(part_name::PACKAGE_RELS)?;
        let mut reader = Reader::from_reader(&rels[..]);
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let mut rel_type = None;
                    let mut target = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Type" => rel_type = Some(attr.unescape_value()?.into_owned()),
                            b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                            _ => {},
                        }
                    }
                    if rel_type.as_deref() == Some(relationship_type::OFFICE_DOCUMENT)
                        && let Some(target) = target
                    {
                        return Ok(target.trim_start_matches('/').to_string());
                    }
                },
                Event::Eof => return Ok(part_name::DOCUMENT.to_string()),
                _ => {},
            }
        }
    }

    /// Bytes of the main document part.
    pub fn main_document(&mut self) -> Result<Vec<u8>> {
        let name = self.main_document_name()?;
        self.read_part(&name)
    }
}

/// Builder for a package held in memory.
pub struct PackageWriter {
    zip_writer: ZipWriter<Cursor<Vec<u8>>>,
    /// `(part name, content type)` overrides for `[Content_Types].xml`
    overrides: Vec<(String, &'static str)>,
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            zip_writer: ZipWriter::new(Cursor::new(Vec::new())),
            overrides: Vec::new(),
        }
    }

    /// Add a part. `content_type` registers an override; parts without one
    /// get the default type for their extension.
    pub fn add_part(&mut self, name: &str, content_type: Option<&'static str>, content: &[u8]) -> Result<()> {
        if let Some(ct) = content_type {
            self.overrides.push((name.to_string(), ct));
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip_writer.start_file(name, options)?;
        self.zip_writer.write_all(content)?;
        Ok(())
    }

    /// Write `[Content_Types].xml` and close the archive.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let content_types = self.content_types_xml();
        self.add_part(part_name::CONTENT_TYPES, None, content_types.as_bytes())?;
        let cursor = self.zip_writer.finish()?;
        Ok(cursor.into_inner())
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES));
        xml.push_str(&format!(
            r#"<Default Extension="rels" ContentType="{}"/>"#,
            ct::OPC_RELATIONSHIPS
        ));
        xml.push_str(&format!(r#"<Default Extension="xml" ContentType="{}"/>"#, ct::XML));
        for (name, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                escape_xml(name),
                content_type
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

/// A relationships part listing `(id, type, target)` entries.
pub fn relationships_xml(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS));
    for (id, rel_type, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id,
            rel_type,
            escape_xml(target)
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_document_follows_relationship() {
        let mut writer = PackageWriter::new();
        let rels = relationships_xml(&[("rId1", relationship_type::OFFICE_DOCUMENT, "word/main.xml")]);
        writer.add_part(part_name::PACKAGE_RELS, None, rels.as_bytes()).unwrap();
        writer
            .add_part("word/main.xml", Some(ct::WML_DOCUMENT_MAIN), b"<w:document/>")
            .unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = PackageReader::new(&bytes).unwrap();
        assert_eq!(reader.main_document_name().unwrap(), "word/main.xml");
        assert_eq!(reader.main_document().unwrap(), b"<w:document/>");

        let types = String::from_utf8(reader.read_part(part_name::CONTENT_TYPES).unwrap()).unwrap();
        assert!(types.contains(r#"<Override PartName="/word/main.xml""#));
    }

    #[test]
    fn test_missing_rels_defaults_to_word_document() {
        let mut writer = PackageWriter::new();
        writer.add_part(part_name::DOCUMENT, None, b"x").unwrap();
        let bytes = writer.finish().unwrap();
        let mut reader = PackageReader::new(&bytes).unwrap();
        assert_eq!(reader.main_document().unwrap(), b"x");
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            PackageReader::new(b"plain text"),
            Err(Error::InvalidFormat(_))
        ));
    }
}
