//! Hyperlink parsing module
//! This module handles the hyperlinks of a worksheet: the `<hyperlink>`
//! elements and the sheet relationships that hold their targets.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::{parse_range_start, CellAddress};
use crate::xml_helpers::{attr_string, attr_string_local};

/// Intermediate hyperlink data parsed from sheet XML
/// Contains the r:id reference that needs to be resolved via relationships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHyperlink {
    /// Cell reference (e.g., "A1" or a range whose top-left cell is used)
    pub cell_ref: String,
    /// Relationship ID for external links (e.g., "rId1")
    pub r_id: Option<String>,
    /// Internal location (e.g., "Sheet2!A1" for internal links)
    pub location: Option<String>,
    /// Display text
    pub display: Option<String>,
}

/// A hyperlink with its target resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHyperlink {
    pub target: String,
    pub display: Option<String>,
    pub is_external: bool,
}

/// Parse a single hyperlink element
pub fn parse_hyperlink_element(e: &BytesStart<'_>) -> Option<RawHyperlink> {
    let cell_ref = attr_string(e, b"ref").filter(|s| !s.is_empty())?;
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    Some(RawHyperlink {
        cell_ref,
        // r:id attribute (namespace prefixed) - for external hyperlinks
        r_id: non_empty(attr_string_local(e, b"id")),
        location: non_empty(attr_string(e, b"location")),
        display: non_empty(attr_string(e, b"display")),
    })
}

/// Parse sheet relationships to get hyperlink targets
/// Returns HashMap of rId -> target URL
pub fn parse_hyperlink_rels<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> HashMap<String, String> {
    let rels_path = construct_rels_path(sheet_path);

    let Ok(file) = archive.by_name(&rels_path) else {
        return HashMap::new(); // Relationships file is optional
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    read_hyperlink_rels(&mut xml)
}

fn read_hyperlink_rels<B: std::io::BufRead>(xml: &mut Reader<B>) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();

                    // Only include hyperlink relationships
                    if rel_type.contains("hyperlink") && !id.is_empty() && !target.is_empty() {
                        rels.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    rels
}

/// Construct the relationships file path from a part path
/// e.g., "xl/worksheets/sheet1.xml" -> "xl/worksheets/_rels/sheet1.xml.rels"
pub fn construct_rels_path(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, filename)) => format!("{dir}/_rels/{filename}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve raw hyperlinks against the sheet relationships.
///
/// Links whose `r:id` is unknown, or that carry no target at all, are dropped.
pub fn resolve_hyperlinks(
    raw_hyperlinks: &[RawHyperlink],
    rels: &HashMap<String, String>,
) -> Vec<(CellAddress, ResolvedHyperlink)> {
    raw_hyperlinks
        .iter()
        .filter_map(|raw| {
            let addr = parse_range_start(&raw.cell_ref)?;
            let (target, is_external) = if let Some(ref r_id) = raw.r_id {
                // External link - resolve via relationship
                (rels.get(r_id)?.clone(), true)
            } else {
                // Internal link (no r:id, only location)
                (raw.location.clone()?, false)
            };

            Some((
                addr,
                ResolvedHyperlink {
                    target,
                    display: raw.display.clone(),
                    is_external,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_rels_path() {
        assert_eq!(
            construct_rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(
            construct_rels_path("xl/workbook.xml"),
            "xl/_rels/workbook.xml.rels"
        );
        assert_eq!(construct_rels_path("sheet.xml"), "_rels/sheet.xml.rels");
    }

    fn hyperlinks_in(xml_data: &str) -> Vec<RawHyperlink> {
        let mut reader = Reader::from_str(xml_data);
        reader.trim_text(true);
        let mut out = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e) | Event::Empty(ref e))
                    if e.local_name().as_ref() == b"hyperlink" =>
                {
                    out.extend(parse_hyperlink_element(e));
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_parse_hyperlink_elements() {
        let hyperlinks = hyperlinks_in(
            r#"<worksheet>
    <hyperlinks>
        <hyperlink ref="A1" r:id="rId1" display="📌 cat.png"/>
        <hyperlink ref="B2" location="Sheet2!A1" display="Go to Sheet2"/>
        <hyperlink ref="C3" r:id="rId2" display=""/>
        <hyperlink r:id="rId4"/>
    </hyperlinks>
</worksheet>"#,
        );

        assert_eq!(hyperlinks.len(), 3);
        assert_eq!(hyperlinks[0].cell_ref, "A1");
        assert_eq!(hyperlinks[0].r_id.as_deref(), Some("rId1"));
        assert_eq!(hyperlinks[0].display.as_deref(), Some("📌 cat.png"));

        assert!(hyperlinks[1].r_id.is_none());
        assert_eq!(hyperlinks[1].location.as_deref(), Some("Sheet2!A1"));

        assert_eq!(hyperlinks[2].display, None);
    }

    #[test]
    fn test_read_rels_keeps_only_hyperlinks() {
        let mut reader = Reader::from_str(
            r#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="evidence/cat.png" TargetMode="External"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
</Relationships>"#,
        );
        let rels = read_hyperlink_rels(&mut reader);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels["rId1"], "evidence/cat.png");
    }

    #[test]
    fn test_resolve_hyperlinks() {
        let raw = vec![
            RawHyperlink {
                cell_ref: "A1".to_string(),
                r_id: Some("rId1".to_string()),
                location: None,
                display: Some("📌 cat.png".to_string()),
            },
            RawHyperlink {
                cell_ref: "B2:C4".to_string(),
                r_id: None,
                location: Some("Sheet2!A1".to_string()),
                display: None,
            },
            RawHyperlink {
                cell_ref: "C3".to_string(),
                r_id: Some("rId999".to_string()), // Non-existent
                location: None,
                display: None,
            },
        ];

        let mut rels = HashMap::new();
        rels.insert("rId1".to_string(), "evidence/cat.png".to_string());

        let resolved = resolve_hyperlinks(&raw, &rels);
        assert_eq!(resolved.len(), 2);

        assert_eq!(resolved[0].0, CellAddress::ORIGIN);
        assert_eq!(resolved[0].1.target, "evidence/cat.png");
        assert!(resolved[0].1.is_external);

        assert_eq!(resolved[1].0, CellAddress::new(1, 1));
        assert_eq!(resolved[1].1.target, "Sheet2!A1");
        assert!(!resolved[1].1.is_external);
    }
}
