//! Test fixtures for building project archives in memory.
//!
//! [`XlsxBuilder`] writes a one-sheet workbook the way third-party spreadsheet
//! tools do (shared strings, sheet relationships for hyperlinks), and
//! [`ProjectBuilder`] packs it together with evidence files.
//!
//! # Example
//!
//! ```rust
//! use fixtures::{png, ProjectBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .shared("A1", "📌 cat.png")
//!     .hyperlink("A1", "evidence/cat.png", None)
//!     .build();
//! let zip = ProjectBuilder::new()
//!     .evidence("cat.png", &png(4, 4))
//!     .workbook(&xlsx)
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use tickntie::xml_helpers::xml_escape;
use zip::write::FileOptions;
use zip::ZipWriter;

// ============================================================================
// Evidence payloads
// ============================================================================

/// PNG signature plus an IHDR chunk: enough for header sniffing.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut v = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&[8, 6, 0, 0, 0]);
    v
}

/// A tiny PDF-looking payload. Distinct `seed`s give distinct content.
pub fn pdf(seed: u8) -> Vec<u8> {
    let mut v = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    v.extend_from_slice(format!("1 0 obj << /Seed {seed} >> endobj\n%%EOF\n").as_bytes());
    v
}

// ============================================================================
// Workbook builder
// ============================================================================

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Evidence" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

/// Builder for a single-sheet XLSX package.
#[derive(Debug, Clone, Default)]
pub struct XlsxBuilder {
    rows: BTreeMap<u32, Vec<String>>,
    shared_strings: Vec<String>,
    hyperlinks: Vec<String>,
    rels: Vec<(String, String)>,
}

impl XlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell stored in the shared string table (`t="s"`), as Excel writes text.
    pub fn shared(mut self, cell: &str, text: &str) -> Self {
        let idx = self.shared_strings.len();
        self.shared_strings.push(text.to_string());
        self.push_cell(cell, format!(r#"<c r="{cell}" t="s"><v>{idx}</v></c>"#));
        self
    }

    /// Cell stored as an inline string.
    pub fn inline(mut self, cell: &str, text: &str) -> Self {
        let text = xml_escape(text);
        self.push_cell(
            cell,
            format!(r#"<c r="{cell}" t="inlineStr"><is><t xml:space="preserve">{text}</t></is></c>"#),
        );
        self
    }

    pub fn number(mut self, cell: &str, value: &str) -> Self {
        self.push_cell(cell, format!(r#"<c r="{cell}"><v>{value}</v></c>"#));
        self
    }

    /// External hyperlink whose target lives in the sheet relationships.
    pub fn hyperlink(mut self, cell: &str, target: &str, display: Option<&str>) -> Self {
        let id = format!("rId{}", self.rels.len() + 1);
        let display = display
            .map(|d| format!(r#" display="{}""#, xml_escape(d)))
            .unwrap_or_default();
        self.hyperlinks
            .push(format!(r#"<hyperlink ref="{cell}" r:id="{id}"{display}/>"#));
        self.rels.push((id, target.to_string()));
        self
    }

    /// Internal hyperlink (`location`), which has no relationship.
    pub fn location(mut self, cell: &str, location: &str) -> Self {
        self.hyperlinks.push(format!(
            r#"<hyperlink ref="{cell}" location="{}"/>"#,
            xml_escape(location)
        ));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut files: Vec<(&str, String)> = vec![
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", WORKBOOK.to_string()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/sharedStrings.xml", self.shared_strings_xml()),
            ("xl/worksheets/sheet1.xml", self.sheet_xml()),
        ];
        if !self.rels.is_empty() {
            files.push(("xl/worksheets/_rels/sheet1.xml.rels", self.rels_xml()));
        }
        zip_bytes(files.iter().map(|(name, xml)| (*name, xml.as_bytes())))
    }

    fn push_cell(&mut self, cell: &str, xml: String) {
        let row: u32 = cell
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .expect("cell reference needs a row number");
        self.rows.entry(row).or_default().push(xml);
    }

    fn sheet_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>"#,
        );
        for (row, cells) in &self.rows {
            xml.push_str(&format!(r#"<row r="{row}">"#));
            for cell in cells {
                xml.push_str(cell);
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");
        if !self.hyperlinks.is_empty() {
            xml.push_str("<hyperlinks>");
            for link in &self.hyperlinks {
                xml.push_str(link);
            }
            xml.push_str("</hyperlinks>");
        }
        xml.push_str("</worksheet>");
        xml
    }

    fn shared_strings_xml(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">"#,
            n = self.shared_strings.len()
        );
        for s in &self.shared_strings {
            xml.push_str(&format!(r#"<si><t xml:space="preserve">{}</t></si>"#, xml_escape(s)));
        }
        xml.push_str("</sst>");
        xml
    }

    fn rels_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, target) in &self.rels {
            xml.push_str(&format!(
                r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
                xml_escape(target)
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

// ============================================================================
// Project archive builder
// ============================================================================

/// Builder for a project archive with arbitrary entries.
#[derive(Debug, Clone, Default)]
pub struct ProjectBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `evidence/<name>`.
    pub fn evidence(self, name: &str, bytes: &[u8]) -> Self {
        self.file(&format!("evidence/{name}"), bytes)
    }

    pub fn workbook(self, xlsx: &[u8]) -> Self {
        self.file("workbook.xlsx", xlsx)
    }

    pub fn csv(self, text: &str) -> Self {
        self.file("workbook.csv", text.as_bytes())
    }

    pub fn file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.entries.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        zip_bytes(
            self.entries
                .iter()
                .map(|(name, bytes)| (name.as_str(), bytes.as_slice())),
        )
    }
}

fn zip_bytes<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
