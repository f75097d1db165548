//! Relationship parsing - workbook relationships, sheet lookup, shared strings, stylesheet.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::error::{ArchiveError, ArchiveResult};
use crate::types::CellStyle;
use crate::xml_helpers::{attr_string, attr_string_local, decode_cell_text};

use super::styles::parse_styles;

/// Workbook relationships parsed from xl/_rels/workbook.xml.rels
///
/// Paths are resolved relative to the xl/ directory and stored as full paths.
#[derive(Default, Debug)]
pub(super) struct WorkbookRelationships {
    /// Map of rId -> full path for worksheet relationships
    /// e.g., "rId1" -> "xl/worksheets/sheet1.xml"
    pub worksheets: HashMap<String, String>,
    /// Path to shared strings file (e.g., "xl/sharedStrings.xml")
    pub shared_strings: Option<String>,
    /// Path to styles file (e.g., "xl/styles.xml")
    pub styles: Option<String>,
}

/// Parse workbook relationships from xl/_rels/workbook.xml.rels
pub(super) fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> WorkbookRelationships {
    let mut rels = WorkbookRelationships::default();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels; // Relationships file is optional
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();

                    // Resolve target path relative to xl/
                    let full_path = if let Some(stripped) = target.strip_prefix('/') {
                        stripped.to_string()
                    } else {
                        format!("xl/{target}")
                    };

                    // Categorize by relationship type
                    if rel_type.contains("worksheet") && !id.is_empty() && !target.is_empty() {
                        rels.worksheets.insert(id, full_path);
                    } else if rel_type.contains("sharedStrings") {
                        rels.shared_strings = Some(full_path);
                    } else if rel_type.contains("/styles") {
                        rels.styles = Some(full_path);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// Path of the first sheet listed in xl/workbook.xml
pub(super) fn first_sheet_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> ArchiveResult<String> {
    let file = archive.by_name("xl/workbook.xml").map_err(|_| {
        ArchiveError::MalformedWorkbook("xl/workbook.xml is missing".to_string())
    })?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                // r:id attribute (namespace prefixed)
                let r_id = attr_string_local(e, b"id").unwrap_or_default();
                // Fall back to the conventional path when the relationship is missing
                return Ok(relationships
                    .get(&r_id)
                    .cloned()
                    .unwrap_or_else(|| "xl/worksheets/sheet1.xml".to_string()));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ArchiveError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Err(ArchiveError::MalformedWorkbook(
        "workbook lists no sheets".to_string(),
    ))
}

/// Parse shared strings from shared strings file
///
/// Rich-text runs are concatenated; phonetic runs (`rPh`) are skipped.
pub(super) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<String> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Vec::new(); // SharedStrings is optional
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);
    read_shared_strings(&mut xml)
}

fn read_shared_strings<B: std::io::BufRead>(xml: &mut Reader<B>) -> Vec<String> {
    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current_string.clear();
                }
                b"rPh" => in_rph = true,
                b"t" if in_si && !in_rph => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current_string.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) if in_t => {
                current_string.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(decode_cell_text(&current_string).into_owned());
                    current_string.clear();
                    in_si = false;
                }
                b"rPh" => in_rph = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    strings
}

/// Parse stylesheet from styles file
pub(super) fn parse_stylesheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<CellStyle> {
    let styles_path = path.unwrap_or("xl/styles.xml");
    let Ok(file) = archive.by_name(styles_path) else {
        return Vec::new();
    };

    parse_styles(BufReader::new(file))
}
