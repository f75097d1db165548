//! Project archive export.
//!
//! An archive holds the evidence payloads under `evidence/`, a single-sheet
//! `workbook.xlsx` whose linked cells hyperlink to those files, and a
//! human-readable `README.txt`.

pub(crate) mod manifest;
pub mod naming;
pub(crate) mod package;
pub(crate) mod sheet_writer;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cell_ref::CellAddress;
use crate::config::Window;
use crate::error::ArchiveResult;
use crate::links::LinkTable;
use crate::sheet::Spreadsheet;
use crate::types::{ContentLocator, GridCell};

use naming::UniqueNames;

/// Directory holding evidence files inside a project archive.
pub const EVIDENCE_DIR: &str = "evidence/";
/// Spreadsheet artifact name inside a project archive.
pub const WORKBOOK_NAME: &str = "workbook.xlsx";
/// Manifest name inside a project archive.
pub const README_NAME: &str = "README.txt";

/// Archive project name: `<prefix>_<YYYY-MM-DDTHH-MM-SS>`.
#[must_use]
pub fn project_name(prefix: &str, created_at: DateTime<Utc>) -> String {
    format!("{prefix}_{}", created_at.format("%Y-%m-%dT%H-%M-%S"))
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    /// Cells copied into the workbook. Linked cells outside it are always written.
    pub window: Window,
}

impl ExportOptions {
    #[must_use]
    pub fn new(prefix: &str, created_at: DateTime<Utc>, window: Window) -> Self {
        Self {
            project_name: project_name(prefix, created_at),
            created_at,
            window,
        }
    }
}

/// A finished project archive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedArchive {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub evidence_count: usize,
    /// Linked cells whose inline payload could not be decoded.
    pub skipped: Vec<CellAddress>,
}

/// Build a project archive from the sheet content and the link table.
///
/// Each distinct inline locator is written once; every cell linking to it
/// hyperlinks the same file. External locators are not packaged, their cells
/// hyperlink the raw reference instead.
pub fn export_project<S: Spreadsheet + ?Sized>(
    sheet: &S,
    links: &LinkTable,
    options: &ExportOptions,
) -> ArchiveResult<ExportedArchive> {
    let mut names = UniqueNames::new();
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    let mut written: HashMap<ContentLocator, String> = HashMap::new();
    let mut targets: BTreeMap<CellAddress, String> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (addr, link) in links.iter() {
        if let Some(target) = written.get(&link.locator) {
            targets.insert(addr, target.clone());
            continue;
        }
        if !link.locator.is_inline() {
            tracing::debug!(cell = %addr, "external locator not packaged");
            targets.insert(addr, link.locator.as_str().to_string());
            continue;
        }
        let Some(content) = link.locator.decode_inline() else {
            tracing::warn!(cell = %addr, label = %link.label, "undecodable inline payload, evidence not exported");
            skipped.push(addr);
            continue;
        };
        let name = names.claim(&link.label, &content.mime_type);
        let target = format!("{EVIDENCE_DIR}{name}");
        files.push((target.clone(), content.bytes));
        written.insert(link.locator.clone(), target.clone());
        targets.insert(addr, target);
    }

    let mut cells: BTreeMap<CellAddress, GridCell> = BTreeMap::new();
    for addr in options.window.addresses() {
        let text = sheet.cell_text(addr);
        if !text.is_empty() {
            cells.insert(addr, grid_cell(sheet, addr, text));
        }
    }
    for (addr, link) in links.iter() {
        let cell = cells.entry(addr).or_insert_with(|| {
            let text = sheet.cell_text(addr);
            let text = if text.is_empty() {
                link.marker_text()
            } else {
                text
            };
            grid_cell(sheet, addr, text)
        });
        cell.hyperlink = targets.get(&addr).cloned();
    }

    let cells: Vec<GridCell> = cells.into_values().collect();
    let workbook = package::write_workbook(&cells)?;
    let readme = manifest::readme(&options.project_name, files.len(), options.created_at);

    let mut entries: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    entries.push((WORKBOOK_NAME, workbook.as_slice()));
    entries.push((README_NAME, readme.as_bytes()));
    let bytes = package::write_zip(entries)?;

    tracing::info!(
        project = %options.project_name,
        evidence = files.len(),
        cells = cells.len(),
        skipped = skipped.len(),
        "exported project archive"
    );

    Ok(ExportedArchive {
        file_name: format!("{}.zip", options.project_name),
        bytes,
        evidence_count: files.len(),
        skipped,
    })
}

fn grid_cell<S: Spreadsheet + ?Sized>(sheet: &S, addr: CellAddress, text: String) -> GridCell {
    let mut style = sheet.cell_style(addr).unwrap_or_default();
    if text.contains('\n') {
        style.wrap_text = true;
    }
    GridCell {
        address: addr,
        text,
        hyperlink: None,
        style: (!style.is_plain()).then_some(style),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::sheet::MemorySheet;
    use crate::types::EvidenceLink;
    use chrono::TimeZone;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn options() -> ExportOptions {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap();
        ExportOptions::new("TicknTie_Project", at, Window::default())
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_project_name_format() {
        assert_eq!(
            options().project_name,
            "TicknTie_Project_2024-05-01T09-30-15"
        );
    }

    #[test]
    fn test_shared_locator_exported_once() {
        let a1 = CellAddress::ORIGIN;
        let b2 = CellAddress::new(1, 1);
        let locator = ContentLocator::inline("image/png", b"png-bytes");
        let mut links = LinkTable::new();
        links.set(a1, EvidenceLink::new(locator.clone(), "cat.png"));
        links.set(b2, EvidenceLink::new(locator, "cat.png"));
        let sheet = MemorySheet::from_cells([(a1, "📌 cat.png"), (b2, "📌 cat.png")]);

        let archive = export_project(&sheet, &links, &options()).unwrap();
        assert_eq!(archive.evidence_count, 1);
        assert_eq!(archive.file_name, "TicknTie_Project_2024-05-01T09-30-15.zip");

        assert_eq!(
            entry_names(&archive.bytes),
            ["README.txt", "evidence/cat.png", "workbook.xlsx"]
        );
    }

    #[test]
    fn test_empty_linked_cell_gets_marker_text() {
        let far = CellAddress::new(500, 3);
        let mut links = LinkTable::new();
        links.set(
            far,
            EvidenceLink::new(ContentLocator::inline("application/pdf", b"%PDF"), "scan.pdf"),
        );
        let sheet = MemorySheet::new();

        let archive = export_project(&sheet, &links, &options()).unwrap();
        let mut zip = ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let mut xlsx = Vec::new();
        zip.by_name(WORKBOOK_NAME)
            .unwrap()
            .read_to_end(&mut xlsx)
            .unwrap();
        let cells = crate::parser::read_workbook(&xlsx).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].address, far);
        assert_eq!(cells[0].text, "📌 scan.pdf");
        assert_eq!(cells[0].hyperlink.as_deref(), Some("evidence/scan.pdf"));
    }

    #[test]
    fn test_external_and_corrupt_locators() {
        let a1 = CellAddress::ORIGIN;
        let a2 = CellAddress::new(1, 0);
        let mut links = LinkTable::new();
        links.set(
            a1,
            EvidenceLink::new(ContentLocator::external("https://example.com/x.png"), "x.png"),
        );
        links.set(
            a2,
            EvidenceLink::new(ContentLocator::external("data:image/png;base64,@@@"), "bad.png"),
        );
        let sheet = MemorySheet::from_cells([(a1, "📌 x.png"), (a2, "📌 bad.png")]);

        let archive = export_project(&sheet, &links, &options()).unwrap();
        assert_eq!(archive.evidence_count, 0);
        assert_eq!(archive.skipped, [a2]);
        assert_eq!(entry_names(&archive.bytes), ["README.txt", "workbook.xlsx"]);
    }

    #[test]
    fn test_multiline_text_wraps() {
        let sheet = MemorySheet::from_cells([(CellAddress::ORIGIN, "a\nb")]);
        let cell = grid_cell(&sheet, CellAddress::ORIGIN, "a\nb".into());
        assert!(cell.style.unwrap().wrap_text);
    }
}
